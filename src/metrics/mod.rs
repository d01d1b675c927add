//! The metrics engine: turns normalized subscription records into a `MetricsResult`.
//!
//! Everything here is synchronous and free of side effects other than logging.

mod format;
mod monthly;
mod policy;
mod summary;

pub use format::{Days, Percent};
pub use monthly::{month_range, MonthlySeries};
pub use policy::{ChurnDenominator, MonthRange, ReportPolicy};
pub use summary::{
    calculate_arpu, calculate_average_subscription_length, calculate_churn_rate, calculate_ltv,
    calculate_mrr, count_active_users,
};

pub(crate) use policy::default_churn_statuses;

use crate::model::{Amount, MonthBucket, SubscriptionRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// The metrics of a subscription export.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResult {
    pub mrr: Amount,
    pub churn_rate: Percent,
    pub ltv: Amount,
    pub arpu: Amount,
    pub average_subscription_length_days: Days,
    pub active_users: u64,
    pub total_records: u64,
    pub mrr_by_month: BTreeMap<MonthBucket, Amount>,
    pub users_by_month: BTreeMap<MonthBucket, u64>,
    pub new_users_by_month: BTreeMap<MonthBucket, u64>,
    pub churn_by_month: BTreeMap<MonthBucket, Percent>,
    pub cancellations_by_month: BTreeMap<MonthBucket, u64>,
}

impl MetricsResult {
    pub fn compute(records: &[SubscriptionRecord], policy: &ReportPolicy) -> Self {
        let active_users = count_active_users(records);
        let mrr = calculate_mrr(records);
        let churn_rate = calculate_churn_rate(records, policy.churn_statuses());
        let arpu = calculate_arpu(mrr, active_users);
        let ltv = calculate_ltv(arpu, churn_rate);
        let average = calculate_average_subscription_length(records, policy.as_of());
        let MonthlySeries {
            mrr_by_month,
            users_by_month,
            new_users_by_month,
            churn_by_month,
            cancellations_by_month,
        } = monthly::compute(records, policy);

        debug!(
            "Computed metrics for {} records as of {}: MRR {mrr}, churn {churn_rate}, \
            {active_users} active",
            records.len(),
            policy.as_of()
        );

        Self {
            mrr,
            churn_rate,
            ltv,
            arpu,
            average_subscription_length_days: average,
            active_users,
            total_records: records.len() as u64,
            mrr_by_month,
            users_by_month,
            new_users_by_month,
            churn_by_month,
            cancellations_by_month,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, CellValue, RawRow, Records, SubscriptionRecord, STATUS_ACTIVE};
    use rust_decimal::Decimal;
    use chrono::NaiveDate;
    use serde_json::json;

    fn raw(cells: &[(&str, &str)]) -> RawRow {
        cells
            .iter()
            .map(|(h, v)| (h.to_string(), CellValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_compute_from_raw_rows() {
        let rows = vec![
            raw(&[
                ("Status", "Ativa"),
                ("Valor", "100"),
                ("Data Início", "15/11/2022 08:00"),
            ]),
            raw(&[
                ("Status", "Cancelada"),
                ("Valor", "50"),
                ("Data Início", "01/12/2022 08:00"),
                ("Data Cancelamento", "10/01/2023 09:00"),
                ("Data Status", "10/01/2023 09:00"),
            ]),
        ];
        let records = Records::parse(rows);
        let policy = ReportPolicy::new(NaiveDate::from_ymd_opt(2023, 1, 31).unwrap());
        let result = MetricsResult::compute(records.data(), &policy);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            json!({
                "mrr": "100.00",
                "churnRate": "50.00%",
                "ltv": "200.00",
                "arpu": "100.00",
                "averageSubscriptionLengthDays": "77 days",
                "activeUsers": 1,
                "totalRecords": 2,
                "mrrByMonth": {"11-2022": "150.00", "12-2022": "150.00", "01-2023": "100.00"},
                "usersByMonth": {"11-2022": 2, "12-2022": 2, "01-2023": 1},
                "newUsersByMonth": {"11-2022": 1, "12-2022": 1},
                "churnByMonth": {"01-2023": "100.00%"},
                "cancellationsByMonth": {"01-2023": 1}
            })
        );
    }

    #[test]
    fn test_compute_with_huge_values() {
        let rows = vec![
            raw(&[("Status", "Ativa"), ("Valor", "50000000000000000000000000000")]),
            raw(&[("Status", "Ativa"), ("Valor", "50000000000000000000000000000")]),
        ];
        let records = Records::parse(rows);
        assert_eq!(records.issues().len(), 2);
        let policy = ReportPolicy::new(NaiveDate::from_ymd_opt(2023, 1, 31).unwrap());
        let result = MetricsResult::compute(records.data(), &policy);
        assert_eq!(result.mrr.to_string(), "0.00");
        assert_eq!(result.active_users, 2);

        // records built in code skip the price limit, so the sums saturate instead
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let huge = SubscriptionRecord {
            status: STATUS_ACTIVE.into(),
            value: Some(Amount::new(Decimal::MAX)),
            start_date: Some(start),
            ..Default::default()
        };
        let result = MetricsResult::compute(&[huge.clone(), huge], &policy);
        assert_eq!(result.mrr.value(), Decimal::MAX);
        assert_eq!(result.mrr_by_month.values().next().unwrap().value(), Decimal::MAX);
    }

    #[test]
    fn test_compute_empty() {
        let policy = ReportPolicy::new(NaiveDate::from_ymd_opt(2023, 1, 31).unwrap());
        let result = MetricsResult::compute(&[], &policy);
        assert_eq!(result.mrr.to_string(), "0.00");
        assert_eq!(result.churn_rate.to_string(), "0.00%");
        assert_eq!(result.ltv.to_string(), "0.00");
        assert_eq!(result.average_subscription_length_days.to_string(), "0 days");
        assert_eq!(result.total_records, 0);
        assert!(result.mrr_by_month.is_empty());
        assert!(result.churn_by_month.is_empty());
    }
}

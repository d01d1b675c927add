//! Whole-dataset metrics as of a single date.

use crate::metrics::format::{Days, Percent};
use crate::model::{Amount, SubscriptionRecord};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// The number of records whose status is `Ativa`.
pub fn count_active_users(records: &[SubscriptionRecord]) -> u64 {
    records.iter().filter(|r| r.is_active()).count() as u64
}

/// The sum of the values of active records. Active records without a value are skipped.
pub fn calculate_mrr(records: &[SubscriptionRecord]) -> Amount {
    records
        .iter()
        .filter(|r| r.is_active())
        .filter_map(SubscriptionRecord::value)
        .sum()
}

/// The share of all records whose status is one of `churn_statuses`.
pub fn calculate_churn_rate<S: AsRef<str>>(
    records: &[SubscriptionRecord],
    churn_statuses: &[S],
) -> Percent {
    let churned = records
        .iter()
        .filter(|r| r.has_status_in(churn_statuses))
        .count();
    Percent::ratio(churned as u64, records.len() as u64)
}

/// Average revenue per active user.
pub fn calculate_arpu(mrr: Amount, active_users: u64) -> Amount {
    mrr.value()
        .checked_div(Decimal::from(active_users))
        .map(Amount::new)
        .unwrap_or(Amount::ZERO)
}

/// ARPU divided by the churn rate. Zero when nobody churns.
pub fn calculate_ltv(arpu: Amount, churn_rate: Percent) -> Amount {
    if churn_rate.is_zero() {
        return Amount::ZERO;
    }
    arpu.value()
        .checked_div(churn_rate.value())
        .map(Amount::new)
        .unwrap_or(Amount::ZERO)
}

/// The average number of days that active records with a start date have lasted, up to their
/// cancellation date or `as_of`.
///
/// A record whose start is after its end still counts towards the average but adds no days.
pub fn calculate_average_subscription_length(
    records: &[SubscriptionRecord],
    as_of: NaiveDate,
) -> Days {
    let mut total_days = 0i64;
    let mut count = 0u64;
    for record in records.iter().filter(|r| r.is_active()) {
        let Some(start) = record.start_date() else {
            continue;
        };
        let end = record.cancel_date().unwrap_or(as_of);
        if start <= end {
            total_days += (end - start).num_days();
        }
        count += 1;
    }
    Days::average(total_days, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{STATUS_ACTIVE, STATUS_CANCELLED, STATUS_TRIAL_CANCELLED};
    use crate::test::record;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_active_and_cancelled_scenario() {
        let records = vec![
            record(STATUS_ACTIVE, Some("100")),
            record(STATUS_CANCELLED, Some("50")),
        ];
        let mrr = calculate_mrr(&records);
        let active = count_active_users(&records);
        let churn = calculate_churn_rate(&records, &[STATUS_CANCELLED]);
        assert_eq!(mrr.to_string(), "100.00");
        assert_eq!(churn.to_string(), "50.00%");
        assert_eq!(active, 1);

        let arpu = calculate_arpu(mrr, active);
        assert_eq!(arpu.to_string(), "100.00");
        assert_eq!(calculate_ltv(arpu, churn).to_string(), "200.00");
    }

    #[test]
    fn test_empty_dataset() {
        let records: Vec<SubscriptionRecord> = Vec::new();
        assert_eq!(count_active_users(&records), 0);
        assert_eq!(calculate_mrr(&records).to_string(), "0.00");
        assert_eq!(
            calculate_churn_rate(&records, &[STATUS_CANCELLED]).to_string(),
            "0.00%"
        );
        assert_eq!(
            calculate_average_subscription_length(&records, ymd(2023, 9, 30)).to_string(),
            "0 days"
        );
    }

    #[test]
    fn test_mrr_skips_missing_values_but_counts_zero() {
        let records = vec![
            record(STATUS_ACTIVE, Some("0")),
            record(STATUS_ACTIVE, None),
            record(STATUS_ACTIVE, Some("49,90")),
        ];
        assert_eq!(calculate_mrr(&records).to_string(), "49.90");
        assert_eq!(count_active_users(&records), 3);
    }

    #[test]
    fn test_active_users_never_exceed_records() {
        let records = vec![
            record(STATUS_ACTIVE, None),
            record("Upgrade", None),
            record(STATUS_TRIAL_CANCELLED, None),
        ];
        assert!(count_active_users(&records) <= records.len() as u64);
        assert_eq!(count_active_users(&records), 1);
    }

    #[test]
    fn test_churn_statuses_are_configurable() {
        let records = vec![
            record(STATUS_ACTIVE, None),
            record(STATUS_CANCELLED, None),
            record(STATUS_TRIAL_CANCELLED, None),
            record(STATUS_TRIAL_CANCELLED, None),
        ];
        assert_eq!(
            calculate_churn_rate(&records, &[STATUS_CANCELLED]).to_string(),
            "25.00%"
        );
        assert_eq!(
            calculate_churn_rate(&records, &[STATUS_CANCELLED, STATUS_TRIAL_CANCELLED])
                .to_string(),
            "75.00%"
        );
    }

    #[test]
    fn test_ltv_is_zero_without_churn() {
        let arpu = Amount::from_f64(120.0).unwrap();
        assert!(calculate_ltv(arpu, Percent::ZERO).is_zero());
    }

    #[test]
    fn test_ltv_without_active_users_is_zero() {
        let records = vec![record(STATUS_CANCELLED, Some("50"))];
        let mrr = calculate_mrr(&records);
        let arpu = calculate_arpu(mrr, count_active_users(&records));
        let churn = calculate_churn_rate(&records, &[STATUS_CANCELLED]);
        assert!(arpu.is_zero());
        assert!(calculate_ltv(arpu, churn).is_zero());
    }

    #[test]
    fn test_average_length_one_year() {
        let mut active = record(STATUS_ACTIVE, Some("100"));
        active.start_date = Some(ymd(2022, 9, 30));
        let length = calculate_average_subscription_length(&[active], ymd(2023, 9, 30));
        assert_eq!(length.to_string(), "365 days");
    }

    #[test]
    fn test_average_length_uses_cancel_date() {
        let mut active = record(STATUS_ACTIVE, None);
        active.start_date = Some(ymd(2023, 1, 1));
        active.cancel_date = Some(ymd(2023, 1, 31));
        let length = calculate_average_subscription_length(&[active], ymd(2023, 9, 30));
        assert_eq!(length.value(), 30);
    }

    #[test]
    fn test_average_length_inverted_dates_still_count() {
        let mut ok = record(STATUS_ACTIVE, None);
        ok.start_date = Some(ymd(2023, 1, 1));
        ok.cancel_date = Some(ymd(2023, 1, 11));
        let mut inverted = record(STATUS_ACTIVE, None);
        inverted.start_date = Some(ymd(2023, 2, 1));
        inverted.cancel_date = Some(ymd(2023, 1, 1));
        let no_start = record(STATUS_ACTIVE, None);
        let length =
            calculate_average_subscription_length(&[ok, inverted, no_start], ymd(2023, 9, 30));
        assert_eq!(length.value(), 5);
    }

    #[test]
    fn test_average_length_ignores_inactive() {
        let mut cancelled = record(STATUS_CANCELLED, None);
        cancelled.start_date = Some(ymd(2020, 1, 1));
        let length = calculate_average_subscription_length(&[cancelled], ymd(2023, 9, 30));
        assert_eq!(length.to_string(), "0 days");
    }
}

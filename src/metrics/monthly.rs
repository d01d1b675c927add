//! Monthly series.
//!
//! Each record is visited once and filed under the months it affects. The series are then
//! rendered from those maps over the report's month range.
//!
//! For the MRR and active-user series a subscription whose status is ongoing (`Ativa` or
//! `Upgrade`) counts in every month of the range. Any other subscription counts in the months
//! strictly before its end month, which is the month of its cancellation date or of the as-of
//! date when it has none.

use crate::metrics::format::Percent;
use crate::metrics::policy::{ChurnDenominator, MonthRange, ReportPolicy};
use crate::model::{Amount, MonthBucket, SubscriptionRecord};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};
use tracing::trace;

/// The month-keyed results of a report.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct MonthlySeries {
    pub mrr_by_month: BTreeMap<MonthBucket, Amount>,
    pub users_by_month: BTreeMap<MonthBucket, u64>,
    pub new_users_by_month: BTreeMap<MonthBucket, u64>,
    pub churn_by_month: BTreeMap<MonthBucket, Percent>,
    pub cancellations_by_month: BTreeMap<MonthBucket, u64>,
}

/// Revenue and head count.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
struct Tally {
    value: Decimal,
    count: u64,
}

impl Tally {
    fn add(&mut self, other: Tally) {
        self.value = self.value.saturating_add(other.value);
        self.count = self.count.saturating_add(other.count);
    }

    fn of(record: &SubscriptionRecord) -> Self {
        Self {
            value: record.value().map(|v| v.value()).unwrap_or_default(),
            count: 1,
        }
    }
}

/// Who is paying in a given month: ongoing subscriptions plus those ending after that month.
#[derive(Debug, Default)]
struct ActiveLedger {
    ongoing: Tally,
    ending: BTreeMap<MonthBucket, Tally>,
}

impl ActiveLedger {
    fn add(&mut self, record: &SubscriptionRecord, policy: &ReportPolicy) {
        if record.is_ongoing() {
            self.ongoing.add(Tally::of(record));
        } else {
            self.ending
                .entry(record.end_month(policy.as_of()))
                .or_default()
                .add(Tally::of(record));
        }
    }

    /// The tally for a single month.
    fn at(&self, month: MonthBucket) -> Tally {
        let mut tally = self.ongoing;
        for (_, ending) in self.ending.range((Excluded(month), Unbounded)) {
            tally.add(*ending);
        }
        tally
    }

    /// The tally for every month from `start` through `end`, computed as a running sum from the
    /// last month backwards.
    fn render(&self, start: MonthBucket, end: MonthBucket) -> BTreeMap<MonthBucket, Tally> {
        let months: Vec<MonthBucket> = start.through(end).collect();
        let mut ending = self.ending.iter().rev().peekable();
        let mut tally = self.ongoing;
        let mut out = BTreeMap::new();
        for &month in months.iter().rev() {
            while let Some((_, t)) = ending.next_if(|(end_month, _)| **end_month > month) {
                tally.add(*t);
            }
            out.insert(month, tally);
        }
        out
    }
}

/// The first and last month of the report, if there are any.
pub fn month_range(
    records: &[SubscriptionRecord],
    range: &MonthRange,
) -> Option<(MonthBucket, MonthBucket)> {
    match range {
        MonthRange::Fixed { start, end } => Some((*start, *end)),
        MonthRange::Derived => {
            let months = records
                .iter()
                .flat_map(|r| [r.start_date(), r.cancel_date(), r.status_date()])
                .flatten()
                .map(MonthBucket::from_date);
            months.fold(None, |acc, m| match acc {
                None => Some((m, m)),
                Some((min, max)) => Some((std::cmp::min(min, m), std::cmp::max(max, m))),
            })
        }
    }
}

/// Computes every monthly series in a single pass over `records`.
pub fn compute(records: &[SubscriptionRecord], policy: &ReportPolicy) -> MonthlySeries {
    let mut ledger = ActiveLedger::default();
    let mut new_users: BTreeMap<MonthBucket, u64> = BTreeMap::new();
    let mut churned: BTreeMap<MonthBucket, u64> = BTreeMap::new();
    let mut cancellations: BTreeMap<MonthBucket, u64> = BTreeMap::new();

    for record in records {
        ledger.add(record, policy);
        if let Some(start) = record.start_date() {
            *new_users.entry(start.into()).or_default() += 1;
        }
        if record.has_status_in(policy.churn_statuses()) {
            if let Some(status_date) = record.status_date() {
                *churned.entry(status_date.into()).or_default() += 1;
            }
            if let Some(cancel_date) = record.cancel_date() {
                *cancellations.entry(cancel_date.into()).or_default() += 1;
            }
        }
    }

    let mut series = MonthlySeries::default();
    if let Some((start, end)) = month_range(records, policy.month_range()) {
        trace!("Rendering monthly series from {start} through {end}");
        for (month, tally) in ledger.render(start, end) {
            series.mrr_by_month.insert(month, Amount::new(tally.value));
            series.users_by_month.insert(month, tally.count);
        }
    }

    series.churn_by_month = churned
        .into_iter()
        .map(|(month, count)| {
            let denominator = match policy.churn_denominator() {
                ChurnDenominator::ActiveInMonth => ledger.at(month).count,
                ChurnDenominator::CohortStart => new_users.get(&month).copied().unwrap_or(0),
            };
            (month, Percent::ratio(count, denominator.max(1)))
        })
        .collect();
    series.new_users_by_month = new_users;
    series.cancellations_by_month = cancellations;
    series
}

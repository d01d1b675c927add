use crate::model::{MonthBucket, STATUS_CANCELLED};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The choices that shape a report beyond the data itself.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReportPolicy {
    /// The date treated as "now" for subscriptions that have no cancellation date.
    as_of: NaiveDate,
    month_range: MonthRange,
    /// Statuses that count as churn.
    churn_statuses: Vec<String>,
    churn_denominator: ChurnDenominator,
}

impl ReportPolicy {
    /// A policy with default settings and the given `as_of` date.
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            month_range: MonthRange::default(),
            churn_statuses: default_churn_statuses(),
            churn_denominator: ChurnDenominator::default(),
        }
    }

    /// A policy with default settings as of today, in local time.
    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    pub fn with_month_range(mut self, month_range: MonthRange) -> Self {
        self.month_range = month_range;
        self
    }

    pub fn with_churn_statuses(mut self, churn_statuses: Vec<String>) -> Self {
        self.churn_statuses = churn_statuses;
        self
    }

    pub fn with_churn_denominator(mut self, churn_denominator: ChurnDenominator) -> Self {
        self.churn_denominator = churn_denominator;
        self
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn month_range(&self) -> &MonthRange {
        &self.month_range
    }

    pub fn churn_statuses(&self) -> &[String] {
        &self.churn_statuses
    }

    pub fn churn_denominator(&self) -> ChurnDenominator {
        self.churn_denominator
    }
}

pub(crate) fn default_churn_statuses() -> Vec<String> {
    vec![STATUS_CANCELLED.to_string()]
}

/// The months covered by the monthly MRR and active-user series.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MonthRange {
    /// From the earliest through the latest month of any date found in the data.
    #[default]
    Derived,
    /// A fixed window, inclusive at both ends.
    Fixed {
        start: MonthBucket,
        end: MonthBucket,
    },
}

/// What the churn for a month is divided by.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChurnDenominator {
    /// The number of subscriptions active in the month.
    #[default]
    ActiveInMonth,
    /// The number of subscriptions that started in the month.
    CohortStart,
}

serde_plain::derive_display_from_serialize!(ChurnDenominator);
serde_plain::derive_fromstr_from_deserialize!(ChurnDenominator);

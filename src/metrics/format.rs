//! Values that render in the fixed formats of a metrics report.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// A ratio that renders as a percentage with two decimals, e.g. `0.1234` renders as `12.34%`.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Percent(Decimal);

impl Percent {
    pub const ZERO: Percent = Percent(Decimal::ZERO);

    /// `numerator / denominator`, or zero when the denominator is zero.
    pub fn ratio(numerator: u64, denominator: u64) -> Self {
        Decimal::from(numerator)
            .checked_div(Decimal::from(denominator))
            .map(Percent)
            .unwrap_or(Percent::ZERO)
    }

    /// The ratio, not multiplied by 100.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Display for Percent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pct = (self.0 * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        write!(f, "{pct:.2}%")
    }
}

impl Serialize for Percent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// A whole number of days that renders as `N days`.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Days(u64);

impl Days {
    /// The average of `total_days` over `count`, rounded to the nearest day. Zero when `count` is
    /// zero.
    pub fn average(total_days: i64, count: u64) -> Self {
        let days = Decimal::from(total_days)
            .checked_div(Decimal::from(count))
            .map(|d| d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|d| d.to_u64())
            .unwrap_or(0);
        Days(days)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Days {
    fn from(value: u64) -> Self {
        Days(value)
    }
}

impl Display for Days {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} days", self.0)
    }
}

impl Serialize for Days {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

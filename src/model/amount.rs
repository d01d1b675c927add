//! Amount type for handling the monetary values found in subscription exports.
//!
//! Spreadsheet exports are produced by people in many locales, so the same price may arrive as
//! `49.90`, `49,90`, `R$ 1.234,56` or `$1,234.56`. [`Amount`] parses all of these into a `Decimal`
//! and writes itself with exactly two decimal places and no grouping, e.g. `1234.56`. Record
//! output uses [`Amount::exact`] instead so that no precision is lost.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

/// Currency markers that may prefix an amount. Longer markers come first.
const CURRENCY_MARKERS: &[&str] = &["US$", "R$", "$", "€", "£"];

/// The largest magnitude accepted as a subscription price.
const MAX_UNITS: u64 = 1_000_000_000_000_000;

/// Represents a monetary value.
///
/// Equality and ordering are numeric, so `Amount::from_str("50")` equals
/// `Amount::from_str("50,00")`.
///
/// # Examples
///
/// ```
/// # use submetrics::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("R$ 1.234,5").unwrap();
/// assert_eq!(amount.to_string(), "1234.50");
///
/// let amount = Amount::from_str("$1,234.56").unwrap();
/// assert_eq!(amount.to_string(), "1234.56");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    value: Decimal,
}

impl Amount {
    pub const ZERO: Amount = Amount {
        value: Decimal::ZERO,
    };

    pub const fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Converts a numeric spreadsheet cell. Returns `None` for NaN and infinite values.
    pub fn from_f64(value: f64) -> Option<Self> {
        Decimal::from_f64(value).map(Amount::new)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.value.is_sign_negative()
    }

    /// Whether the magnitude is small enough to be a price. Sums of many such values stay far
    /// below what `Decimal` can hold.
    pub fn is_within_limit(&self) -> bool {
        self.value.abs() <= Decimal::from(MAX_UNITS)
    }

    /// The value with the precision it was parsed with, e.g. `49.999` or `1234.50`.
    pub fn exact(&self) -> String {
        self.value.to_string()
    }

    /// The value rounded to cents, half away from zero.
    pub fn rounded(&self) -> Decimal {
        self.value
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub enum AmountError {
    Empty,
    Malformed(String),
    Decimal(rust_decimal::Error),
}

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::Empty => f.write_str("An amount cannot be empty"),
            AmountError::Malformed(s) => write!(f, "'{s}' is not a number"),
            AmountError::Decimal(e) => Display::fmt(e, f),
        }
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AmountError::Decimal(e) => Some(e),
            _ => None,
        }
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Remove all whitespace, including the non-breaking spaces some locales group with
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(AmountError::Empty);
        }

        let (negative, unsigned) = match compact.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, compact.strip_prefix('+').unwrap_or(&compact)),
        };

        let digits = CURRENCY_MARKERS
            .iter()
            .find_map(|marker| unsigned.strip_prefix(marker))
            .unwrap_or(unsigned);

        let canonical = canonical_decimal(digits)
            .ok_or_else(|| AmountError::Malformed(s.trim().to_string()))?;
        let value = Decimal::from_str(&canonical).map_err(AmountError::Decimal)?;
        Ok(Amount::new(if negative { -value } else { value }))
    }
}

/// Rewrites a string of digits with `.` and `,` separators into the form `Decimal` expects, e.g.
/// `1.234,56` -> `1234.56`. Returns `None` if the string has anything other than digits and
/// separators, or if the separators cannot be interpreted.
fn canonical_decimal(s: &str) -> Option<String> {
    if !s.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if !s.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let dots = s.matches('.').count();
    let commas = s.matches(',').count();

    let (decimal_sep, group_sep) = match (dots, commas) {
        (0, 0) => return Some(s.to_string()),
        (_, 0) if dots == 1 => (Some('.'), None),
        (_, 0) => (None, Some('.')),
        (0, 1) => {
            let after = s.len() - s.rfind(',')? - 1;
            if (1..=2).contains(&after) {
                (Some(','), None)
            } else {
                (None, Some(','))
            }
        }
        (0, _) => (None, Some(',')),
        _ => {
            // Both separators are present: whichever comes last is the decimal separator
            if s.rfind('.')? > s.rfind(',')? {
                (Some('.'), Some(','))
            } else {
                (Some(','), Some('.'))
            }
        }
    };

    if let Some(d) = decimal_sep {
        if s.matches(d).count() != 1 {
            return None;
        }
    }

    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if Some(c) == group_sep {
            continue;
        }
        if Some(c) == decimal_sep {
            out.push('.');
        } else {
            out.push(c);
        }
    }
    if out.starts_with('.') {
        out.insert(0, '0');
    }
    if out.ends_with('.') {
        out.push('0');
    }
    Some(out)
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rounded())
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount::new(self.value.saturating_add(rhs.value))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

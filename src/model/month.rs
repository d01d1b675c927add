use anyhow::bail;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A calendar month used as an aggregation key.
/// Serializes to a string format like "01-2023" so it can be used as a JSON object key.
///
/// Ordering is by year and then by month. Note that the `MM-YYYY` strings themselves do not sort
/// chronologically ("01-2023" < "12-2022" as strings), so always compare `MonthBucket` values.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MonthBucket {
    // Field order matters for the derived `Ord`.
    year: i32,
    month: u32,
}

impl MonthBucket {
    /// Creates a bucket, `month` is 1-based.
    pub fn new(month: u32, year: i32) -> crate::error::Res<Self> {
        if !(1..=12).contains(&month) {
            bail!("A month must be between 1 and 12, got {month}");
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// The following calendar month.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Every month from `self` through `end`, inclusive. Empty if `end` is before `self`.
    pub fn through(self, end: MonthBucket) -> impl Iterator<Item = MonthBucket> {
        std::iter::successors(Some(self), |m| Some(m.next())).take_while(move |m| *m <= end)
    }
}

impl From<NaiveDate> for MonthBucket {
    fn from(date: NaiveDate) -> Self {
        MonthBucket::from_date(date)
    }
}

impl fmt::Display for MonthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:04}", self.month, self.year)
    }
}

impl FromStr for MonthBucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Expected format: "01-2023", the month may also be unpadded: "1-2023"
        let s = s.trim();
        let Some((month, year)) = s.split_once('-') else {
            bail!("A month must be in the format 'MM-YYYY', got: {s}");
        };

        let month = month
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("Invalid month in '{s}': {e}"))?;
        let year = year
            .parse::<i32>()
            .map_err(|e| anyhow::anyhow!("Invalid year in '{s}': {e}"))?;

        MonthBucket::new(month, year)
    }
}

impl Serialize for MonthBucket {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MonthBucket {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MonthBucket::from_str(&s).map_err(serde::de::Error::custom)
    }
}

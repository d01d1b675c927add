//! Parsing of date cells.
//!
//! A date cell can reach us in one of several encodings depending on how the spreadsheet was
//! exported:
//! - a localized string `D/M/Y H:M`, where the day and month have one or two digits, the year has
//!   two to four digits and the time is optional,
//! - a numeric spreadsheet serial date, counted in days from 1900-01-01,
//! - an ISO 8601 date or date-time.
//!
//! Only the calendar date is kept. Anything else is not a date and yields `None`.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};

/// The largest serial accepted, which is 9999-12-31.
const MAX_SERIAL: f64 = 2_958_463.0;

/// Parses the text of a date cell.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(serial) = s.parse::<f64>() {
        return serial_to_date(serial);
    }
    parse_localized(s).or_else(|| parse_iso(s))
}

/// Converts a spreadsheet serial number to a date. Fractions of a day (the time) are dropped.
pub(crate) fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 || serial > MAX_SERIAL {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1900, 1, 1)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

/// `D/M/Y` with an optional ` H:M` or ` H:M:S` suffix.
fn parse_localized(s: &str) -> Option<NaiveDate> {
    let (date, time) = match s.split_once(char::is_whitespace) {
        Some((date, time)) => (date, Some(time.trim())),
        None => (s, None),
    };

    let mut parts = date.split('/');
    let day = numeric_part(parts.next()?, 1, 2)?;
    let month = numeric_part(parts.next()?, 1, 2)?;
    let year = numeric_part(parts.next()?, 2, 4)?;
    if parts.next().is_some() {
        return None;
    }

    if let Some(time) = time {
        if !is_clock_time(time) {
            return None;
        }
    }

    let year = if year < 100 { 2000 + year } else { year };
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

/// `H:M` or `H:M:S` where each component has one or two digits.
fn is_clock_time(s: &str) -> bool {
    let parts: Vec<&str> = s.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return false;
    }
    let limits = [23, 59, 59];
    parts
        .iter()
        .zip(limits)
        .all(|(part, max)| numeric_part(part, 1, 2).is_some_and(|n| n <= max))
}

/// Parses a run of ASCII digits whose length is within `min..=max`.
fn numeric_part(s: &str, min: usize, max: usize) -> Option<u32> {
    if !(min..=max).contains(&s.len()) || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_iso(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

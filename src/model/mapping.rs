//! Canonicalization of spreadsheet headers into field names.
//!
//! Exports arrive with headers such as `Data Início` or `Quantidade Cobranças`. Every header is
//! mapped independently to a camelCase key without diacritics (`dataInicio`,
//! `quantidadeCobrancas`). No schema is assumed: headers that do not correspond to a known
//! subscription field are carried along under their canonical key.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Represents a header as it appeared in the spreadsheet, for example, `Data Início`
#[derive(Default, Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Header(String);

impl AsRef<str> for Header {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl<S: Into<String>> From<S> for Header {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl FromStr for Header {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.into())
    }
}

impl Header {
    /// The canonical field name for this header.
    pub fn key(&self) -> Key {
        Key(normalize_key(&self.0))
    }
}

/// Represents a canonical field name, for example, `dataInicio`
#[derive(Default, Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Key> for String {
    fn from(value: Key) -> Self {
        value.0
    }
}

impl Key {
    /// Whether values under this key are dates. Any key that mentions `data` (Portuguese) or
    /// `date` is treated as a date column.
    pub fn is_date(&self) -> bool {
        is_date_key(&self.0)
    }
}

/// Maps a header to its canonical key: diacritics are removed, the text is lower-cased and the
/// words are joined in camelCase. A key that is already canonical is returned unchanged.
///
/// ```
/// # use submetrics::model::normalize_key;
/// assert_eq!(normalize_key("Data Início"), "dataInicio");
/// assert_eq!(normalize_key("Valor"), "valor");
/// assert_eq!(normalize_key("dataInicio"), "dataInicio");
/// ```
pub fn normalize_key(header: impl AsRef<str>) -> String {
    let header = header.as_ref().trim();
    if is_canonical(header) {
        return header.to_string();
    }
    let lower = strip_diacritics(&header.to_lowercase());
    lower
        .split_whitespace()
        .enumerate()
        .map(|(ix, word)| {
            if ix == 0 {
                word.to_string()
            } else {
                capitalize(word)
            }
        })
        .collect()
}

/// A canonical key has no whitespace, no diacritics and does not start with an upper-case letter.
/// Every output of `normalize_key` is canonical, which makes `normalize_key` idempotent.
fn is_canonical(s: &str) -> bool {
    match s.chars().next() {
        None => true,
        Some(first) => {
            !first.is_uppercase()
                && !s.chars().any(char::is_whitespace)
                && strip_diacritics(s) == s
        }
    }
}

fn strip_diacritics(s: &str) -> String {
    s.nfd().filter(|&c| !is_combining_mark(c)).nfc().collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn is_date_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    lower.contains("data") || lower.contains("date")
}

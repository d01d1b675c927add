use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// A decoded spreadsheet row: the original header mapped to the raw cell value.
pub type RawRow = BTreeMap<String, CellValue>;

/// A raw cell value as produced by a spreadsheet decoder.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Creates a cell from decoded text. Blank text is `Empty`.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }

    /// Whether the cell has no usable content.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Bool(_) | CellValue::Number(_) => false,
        }
    }

    /// The trimmed text of the cell, or `None` if the cell is empty.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            CellValue::Empty => None,
            CellValue::Bool(b) => Some(Cow::Owned(b.to_string())),
            CellValue::Number(n) => Some(Cow::Owned(n.to_string())),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Cow::Borrowed(trimmed))
                }
            }
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.as_text() {
            Some(s) => f.write_str(&s),
            None => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_from_json() {
        let row: RawRow =
            serde_json::from_str(r#"{"Status": "Ativa", "Valor": 49.9, "Obs": null, "Pago": true}"#)
                .unwrap();
        assert_eq!(row["Status"], CellValue::Text("Ativa".into()));
        assert_eq!(row["Valor"], CellValue::Number(49.9));
        assert_eq!(row["Obs"], CellValue::Empty);
        assert_eq!(row["Pago"], CellValue::Bool(true));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(CellValue::text("  "), CellValue::Empty);
        assert_eq!(CellValue::text(" x "), CellValue::Text(" x ".into()));
        assert_eq!(CellValue::text(" x ").as_text().unwrap(), "x");
        assert_eq!(CellValue::Number(100.0).as_text().unwrap(), "100");
        assert!(CellValue::Text("\t".into()).is_empty());
        assert!(CellValue::Empty.as_text().is_none());
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Empty.to_string(), "");
    }
}

use crate::model::mapping::Header;
use crate::model::record::FieldError;
use crate::model::{RawRow, SubscriptionRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The normalized rows of a subscription export along with any problems found while
/// normalizing them.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Records {
    data: Vec<SubscriptionRecord>,
    issues: Vec<RowIssue>,
}

/// A cell that could not be used. The corresponding field is absent from the record.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowIssue {
    /// The spreadsheet row number, where the header is row 1 and the first data row is row 2.
    pub row: usize,
    /// The canonical key of the column.
    pub field: String,
    pub kind: FieldError,
    /// The cell as it appeared in the input.
    pub raw: String,
}

impl Records {
    /// Normalizes decoded rows. This never fails: cells that cannot be parsed are left out of the
    /// record and reported in `issues`.
    pub fn parse<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = RawRow>,
    {
        let mut data = Vec::new();
        let mut issues = Vec::new();
        for (row_ix, row) in rows.into_iter().enumerate() {
            let mut record = SubscriptionRecord::default();
            for (header, cell) in row {
                let key = Header::from(header).key();
                if let Err(kind) = record.set_with_key(&key, &cell) {
                    issues.push(RowIssue {
                        row: row_ix + 2,
                        field: key.into(),
                        kind,
                        raw: cell.to_string(),
                    });
                }
            }
            data.push(record);
        }

        if !issues.is_empty() {
            warn!(
                "{} cells could not be parsed in {} rows and were left empty",
                issues.len(),
                data.len()
            );
            for issue in &issues {
                debug!(
                    "Row {} field '{}': {} for '{}'",
                    issue.row, issue.field, issue.kind, issue.raw
                );
            }
        }

        Self { data, issues }
    }

    pub fn data(&self) -> &[SubscriptionRecord] {
        &self.data
    }

    pub fn issues(&self) -> &[RowIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Converts the records back into rows keyed by canonical field names.
    pub fn to_raw_rows(&self) -> Vec<RawRow> {
        self.data.iter().map(SubscriptionRecord::to_raw_row).collect()
    }
}

impl From<Vec<SubscriptionRecord>> for Records {
    fn from(data: Vec<SubscriptionRecord>) -> Self {
        Self {
            data,
            issues: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;
    use chrono::NaiveDate;

    fn row(cells: &[(&str, CellValue)]) -> RawRow {
        cells
            .iter()
            .map(|(h, c)| (h.to_string(), c.clone()))
            .collect()
    }

    #[test]
    fn test_parse_spreadsheet_headers() {
        let rows = vec![
            row(&[
                ("Status", "Ativa".into()),
                ("Valor", "100".into()),
                ("Data Início", "15/01/2023 10:30".into()),
                ("Quantidade Cobranças", CellValue::Number(8.0)),
                ("ID Assinatura", "sub-1".into()),
            ]),
            row(&[
                ("Status", "Cancelada".into()),
                ("Valor", "50,00".into()),
                ("Data Cancelamento", CellValue::Number(45000.0)),
            ]),
        ];
        let records = Records::parse(rows);
        assert_eq!(records.len(), 2);
        assert!(records.issues().is_empty());

        let first = &records.data()[0];
        assert!(first.is_active());
        assert_eq!(first.value().unwrap().to_string(), "100.00");
        assert_eq!(first.start_date(), NaiveDate::from_ymd_opt(2023, 1, 15));
        assert_eq!(first.billing_count(), Some(8));
        assert_eq!(first.other_fields().get("idAssinatura").unwrap(), "sub-1");

        let second = &records.data()[1];
        assert_eq!(second.status(), "Cancelada");
        assert_eq!(second.cancel_date(), NaiveDate::from_ymd_opt(2023, 3, 17));
    }

    #[test]
    fn test_parse_reports_issues() {
        let rows = vec![
            row(&[("Status", "Ativa".into()), ("Valor", "100".into())]),
            row(&[
                ("Status", "Ativa".into()),
                ("Valor", "abc".into()),
                ("Data Início", "32/01/2023".into()),
            ]),
        ];
        let records = Records::parse(rows);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records.issues(),
            &[
                RowIssue {
                    row: 3,
                    field: "dataInicio".into(),
                    kind: FieldError::InvalidDate,
                    raw: "32/01/2023".into(),
                },
                RowIssue {
                    row: 3,
                    field: "valor".into(),
                    kind: FieldError::InvalidNumber,
                    raw: "abc".into(),
                },
            ]
        );
        let second = &records.data()[1];
        assert_eq!(second.value(), None);
        assert_eq!(second.start_date(), None);
    }

    #[test]
    fn test_parse_empty() {
        let records = Records::parse(Vec::<RawRow>::new());
        assert!(records.is_empty());
        assert!(records.issues().is_empty());
    }

    #[test]
    fn test_normalizing_canonical_rows_is_a_no_op() {
        let rows = vec![row(&[
            ("Status", "Trial cancelado".into()),
            ("Valor", "R$ 29,90".into()),
            ("Data Início", "01/06/2022".into()),
            ("Data Status", "2022-07-01".into()),
            ("Plano", "Mensal".into()),
            ("Data Próxima Cobrança", "01/08/2022".into()),
        ])];
        let once = Records::parse(rows);
        let twice = Records::parse(once.to_raw_rows());
        assert_eq!(once.data(), twice.data());
        assert!(twice.issues().is_empty());
    }

    #[test]
    fn test_normalizing_keeps_value_precision() {
        let rows = vec![
            row(&[("Status", "Ativa".into()), ("Valor", "49.999".into())]),
            row(&[("Status", "Ativa".into()), ("Valor", CellValue::Number(12.345))]),
        ];
        let once = Records::parse(rows);
        let twice = Records::parse(once.to_raw_rows());
        assert_eq!(once.data(), twice.data());
        assert_eq!(twice.data()[0].value().unwrap().exact(), "49.999");
    }
}

use crate::error::Res;
use crate::model::dates::{parse_date, serial_to_date};
use crate::model::mapping::is_date_key;
use crate::model::{Amount, CellValue, MonthBucket, RawRow};
use anyhow::bail;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The status of a subscription that is currently paying.
pub const STATUS_ACTIVE: &str = "Ativa";
/// The status of a subscription that was cancelled.
pub const STATUS_CANCELLED: &str = "Cancelada";
/// The status of a subscription that moved to another plan. It is still paying.
pub const STATUS_UPGRADE: &str = "Upgrade";
/// The status of a trial that ended without converting.
pub const STATUS_TRIAL_CANCELLED: &str = "Trial cancelado";

/// Represents a single normalized row from a subscription export.
///
/// The status is kept as free text since exports are not controlled by us. Values that could not
/// be parsed are `None`.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize)]
pub struct SubscriptionRecord {
    pub(crate) status: String,
    #[serde(
        rename = "valor",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_exact"
    )]
    pub(crate) value: Option<Amount>,
    #[serde(rename = "quantidadeCobrancas", skip_serializing_if = "Option::is_none")]
    pub(crate) billing_count: Option<u32>,
    #[serde(rename = "dataInicio", skip_serializing_if = "Option::is_none")]
    pub(crate) start_date: Option<NaiveDate>,
    #[serde(rename = "dataCancelamento", skip_serializing_if = "Option::is_none")]
    pub(crate) cancel_date: Option<NaiveDate>,
    #[serde(rename = "dataStatus", skip_serializing_if = "Option::is_none")]
    pub(crate) status_date: Option<NaiveDate>,
    /// Date columns that are not subscription fields, by canonical key.
    #[serde(flatten)]
    pub(crate) other_dates: BTreeMap<String, NaiveDate>,
    /// Columns that are not subscription fields, by canonical key.
    #[serde(flatten)]
    pub(crate) other_fields: BTreeMap<String, String>,
}

/// Why a cell could not be used. The field is left absent when this happens.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldError {
    InvalidDate,
    InvalidNumber,
    NegativeValue,
}

serde_plain::derive_display_from_serialize!(FieldError);

impl SubscriptionRecord {
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn value(&self) -> Option<Amount> {
        self.value
    }

    pub fn billing_count(&self) -> Option<u32> {
        self.billing_count
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn cancel_date(&self) -> Option<NaiveDate> {
        self.cancel_date
    }

    pub fn status_date(&self) -> Option<NaiveDate> {
        self.status_date
    }

    pub fn other_fields(&self) -> &BTreeMap<String, String> {
        &self.other_fields
    }

    pub fn other_dates(&self) -> &BTreeMap<String, NaiveDate> {
        &self.other_dates
    }

    /// Whether the subscription is counted as active right now.
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }

    /// Whether the subscription still pays, i.e. it is active or was upgraded.
    pub fn is_ongoing(&self) -> bool {
        self.status == STATUS_ACTIVE || self.status == STATUS_UPGRADE
    }

    /// Whether the status is one of `statuses`.
    pub fn has_status_in<S: AsRef<str>>(&self, statuses: &[S]) -> bool {
        statuses.iter().any(|s| s.as_ref() == self.status)
    }

    /// The month after which the subscription no longer counts: the month of the cancellation, or
    /// the month of `as_of` when there is no cancellation date.
    pub fn end_month(&self, as_of: NaiveDate) -> MonthBucket {
        MonthBucket::from_date(self.cancel_date.unwrap_or(as_of))
    }

    /// Given the canonical `key` and the raw `cell`, set the appropriate field. On error the field
    /// is left unset.
    pub fn set_with_key(
        &mut self,
        key: impl AsRef<str>,
        cell: &CellValue,
    ) -> std::result::Result<(), FieldError> {
        let key = key.as_ref();
        match SubscriptionField::from_key(key) {
            Ok(field) => match field {
                SubscriptionField::Status => {
                    self.status = cell.as_text().map(|s| s.into_owned()).unwrap_or_default()
                }
                SubscriptionField::Valor => self.value = parse_value(cell)?,
                SubscriptionField::QuantidadeCobrancas => {
                    self.billing_count = parse_count(cell)?
                }
                SubscriptionField::DataInicio => self.start_date = parse_date_cell(cell)?,
                SubscriptionField::DataCancelamento => self.cancel_date = parse_date_cell(cell)?,
                SubscriptionField::DataStatus => self.status_date = parse_date_cell(cell)?,
            },
            Err(_) if is_date_key(key) => {
                if let Some(date) = parse_date_cell(cell)? {
                    let _ = self.other_dates.insert(key.to_string(), date);
                }
            }
            Err(_) => {
                if let Some(text) = cell.as_text() {
                    let _ = self.other_fields.insert(key.to_string(), text.into_owned());
                }
            }
        }
        Ok(())
    }

    /// Converts the record back into a row keyed by canonical field names. Normalizing this row
    /// yields an equal record.
    pub fn to_raw_row(&self) -> RawRow {
        let mut row = RawRow::new();
        let mut put = |field: SubscriptionField, value: Option<String>| {
            if let Some(value) = value {
                row.insert(field.to_string(), CellValue::Text(value));
            }
        };
        put(SubscriptionField::Status, Some(self.status.clone()));
        put(SubscriptionField::Valor, self.value.map(|v| v.exact()));
        put(
            SubscriptionField::QuantidadeCobrancas,
            self.billing_count.map(|n| n.to_string()),
        );
        put(SubscriptionField::DataInicio, self.start_date.map(iso));
        put(SubscriptionField::DataCancelamento, self.cancel_date.map(iso));
        put(SubscriptionField::DataStatus, self.status_date.map(iso));
        for (key, date) in &self.other_dates {
            row.insert(key.clone(), CellValue::Text(iso(*date)));
        }
        for (key, value) in &self.other_fields {
            row.insert(key.clone(), CellValue::Text(value.clone()));
        }
        row
    }
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn serialize_exact<S>(value: &Option<Amount>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(amount) => serializer.serialize_str(&amount.exact()),
        None => serializer.serialize_none(),
    }
}

/// Parses the price of a subscription. Prices cannot be negative or absurdly large.
fn parse_value(cell: &CellValue) -> std::result::Result<Option<Amount>, FieldError> {
    let amount = match cell {
        CellValue::Empty => return Ok(None),
        CellValue::Number(n) => Amount::from_f64(*n).ok_or(FieldError::InvalidNumber)?,
        CellValue::Bool(_) => return Err(FieldError::InvalidNumber),
        CellValue::Text(s) => {
            if s.trim().is_empty() {
                return Ok(None);
            }
            Amount::from_str(s).map_err(|_| FieldError::InvalidNumber)?
        }
    };
    if amount.is_negative() {
        return Err(FieldError::NegativeValue);
    }
    if !amount.is_within_limit() {
        return Err(FieldError::InvalidNumber);
    }
    Ok(Some(amount))
}

/// Parses a whole count. A fractional count is truncated.
fn parse_count(cell: &CellValue) -> std::result::Result<Option<u32>, FieldError> {
    let n = match cell {
        CellValue::Empty => return Ok(None),
        CellValue::Number(n) => *n,
        CellValue::Bool(_) => return Err(FieldError::InvalidNumber),
        CellValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.replace(',', ".")
                .parse::<f64>()
                .map_err(|_| FieldError::InvalidNumber)?
        }
    };
    if !n.is_finite() {
        return Err(FieldError::InvalidNumber);
    }
    if n < 0.0 {
        return Err(FieldError::NegativeValue);
    }
    u32::try_from(n.trunc() as u64)
        .map(Some)
        .map_err(|_| FieldError::InvalidNumber)
}

fn parse_date_cell(cell: &CellValue) -> std::result::Result<Option<NaiveDate>, FieldError> {
    let date = match cell {
        CellValue::Empty => return Ok(None),
        CellValue::Number(n) => serial_to_date(*n),
        CellValue::Bool(_) => None,
        CellValue::Text(s) => {
            if s.trim().is_empty() {
                return Ok(None);
            }
            parse_date(s)
        }
    };
    date.map(Some).ok_or(FieldError::InvalidDate)
}

/// Represents the known fields of a subscription export, by canonical key.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubscriptionField {
    #[default]
    Status,
    Valor,
    QuantidadeCobrancas,
    DataInicio,
    DataCancelamento,
    DataStatus,
}

serde_plain::derive_display_from_serialize!(SubscriptionField);
serde_plain::derive_fromstr_from_deserialize!(SubscriptionField);

impl SubscriptionField {
    /// Looks up a field by canonical key. English keys are accepted as aliases.
    pub fn from_key(key: impl AsRef<str>) -> Res<SubscriptionField> {
        let key = key.as_ref();
        match key {
            STATUS_KEY => Ok(SubscriptionField::Status),
            VALOR_KEY | VALUE_KEY | PRICE_KEY => Ok(SubscriptionField::Valor),
            QUANTIDADE_COBRANCAS_KEY | BILLING_COUNT_KEY => {
                Ok(SubscriptionField::QuantidadeCobrancas)
            }
            DATA_INICIO_KEY | START_DATE_KEY => Ok(SubscriptionField::DataInicio),
            DATA_CANCELAMENTO_KEY | CANCEL_DATE_KEY => Ok(SubscriptionField::DataCancelamento),
            DATA_STATUS_KEY | STATUS_DATE_KEY => Ok(SubscriptionField::DataStatus),
            bad => bail!("Invalid subscription field name '{bad}'"),
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(
            self,
            SubscriptionField::DataInicio
                | SubscriptionField::DataCancelamento
                | SubscriptionField::DataStatus
        )
    }
}

impl Display for SubscriptionRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.status)?;
        if let Some(value) = self.value {
            write!(f, " {value}")?;
        }
        if let Some(start) = self.start_date {
            write!(f, " from {start}")?;
        }
        if let Some(cancel) = self.cancel_date {
            write!(f, " until {cancel}")?;
        }
        Ok(())
    }
}

pub(super) const STATUS_KEY: &str = "status";
pub(super) const VALOR_KEY: &str = "valor";
pub(super) const VALUE_KEY: &str = "value";
pub(super) const PRICE_KEY: &str = "price";
pub(super) const QUANTIDADE_COBRANCAS_KEY: &str = "quantidadeCobrancas";
pub(super) const BILLING_COUNT_KEY: &str = "billingCount";
pub(super) const DATA_INICIO_KEY: &str = "dataInicio";
pub(super) const START_DATE_KEY: &str = "startDate";
pub(super) const DATA_CANCELAMENTO_KEY: &str = "dataCancelamento";
pub(super) const CANCEL_DATE_KEY: &str = "cancelDate";
pub(super) const DATA_STATUS_KEY: &str = "dataStatus";
pub(super) const STATUS_DATE_KEY: &str = "statusDate";

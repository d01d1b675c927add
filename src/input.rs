//! Decoding of input files into raw rows.
//!
//! A CSV file must have a header row. A JSON file must hold an array of objects whose values are
//! strings, numbers, booleans or null. In both cases each row maps the original header to the raw
//! cell, and no interpretation of the cells happens here.

use crate::error::{ErrorType, IntoResult, Res};
use crate::model::{CellValue, RawRow};
use crate::{utils, Result};
use anyhow::{bail, Context};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// The format of an input file.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// Comma separated values with a header row.
    Csv,
    /// A JSON array of objects.
    Json,
}

serde_plain::derive_display_from_serialize!(InputFormat);
serde_plain::derive_fromstr_from_deserialize!(InputFormat);

impl InputFormat {
    /// Chooses the format from the extension of `path`.
    pub fn from_path(path: &Path) -> Res<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(InputFormat::Csv),
            Some("json") => Ok(InputFormat::Json),
            Some(other) => bail!(
                "Unsupported file extension '.{other}' for {}, use .csv or .json",
                path.display()
            ),
            None => bail!(
                "Unable to tell the format of {} without a file extension",
                path.display()
            ),
        }
    }

    /// Decodes `bytes` into raw rows.
    pub fn decode(&self, bytes: &[u8]) -> Res<Vec<RawRow>> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        match self {
            InputFormat::Csv => decode_csv(bytes),
            InputFormat::Json => decode_json(bytes),
        }
    }
}

/// Reads the file at `path` and decodes it into raw rows. The format is taken from the extension
/// of `path` when `format` is `None`.
///
/// Files larger than `max_bytes` are rejected before they are read.
pub async fn read_rows(
    path: &Path,
    format: Option<InputFormat>,
    max_bytes: u64,
) -> Result<Vec<RawRow>> {
    let format = match format {
        Some(format) => format,
        None => InputFormat::from_path(path).pub_result(ErrorType::Input)?,
    };
    check_size(path, max_bytes)
        .await
        .pub_result(ErrorType::Input)?;
    let bytes = utils::read_bytes(path).await.pub_result(ErrorType::Input)?;
    let rows = format
        .decode(&bytes)
        .with_context(|| format!("Unable to decode {} as {format}", path.display()))
        .pub_result(ErrorType::Decode)?;
    debug!("Decoded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

async fn check_size(path: &Path, max_bytes: u64) -> Res<()> {
    let size = utils::file_size(path).await?;
    anyhow::ensure!(
        size <= max_bytes,
        "{} is {size} bytes which is more than the limit of {max_bytes} bytes",
        path.display()
    );
    Ok(())
}

fn decode_csv(bytes: &[u8]) -> Res<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    let headers = reader
        .headers()
        .context("Unable to read the CSV header row")?
        .clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        bail!("The CSV header row is empty");
    }

    let mut rows = Vec::new();
    for (ix, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Unable to read CSV row {}", ix + 2))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.trim().is_empty())
            .map(|(header, cell)| (header.to_string(), CellValue::text(cell)))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn decode_json(bytes: &[u8]) -> Res<Vec<RawRow>> {
    serde_json::from_slice(bytes).context("Unable to parse JSON rows, expected an array of objects")
}

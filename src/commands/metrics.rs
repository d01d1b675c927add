use crate::args::{MetricsArgs, NormalizeArgs};
use crate::commands::Out;
use crate::input::{read_rows, InputFormat};
use crate::metrics::MetricsResult;
use crate::model::Records;
use crate::{Config, Result};
use std::path::Path;
use tracing::{debug, info};

/// Reads and normalizes the subscription export described by `args`, then computes its metrics.
///
/// Cells that cannot be parsed do not fail the command. They are left out and counted in the
/// message.
///
/// # Errors
/// - Returns an `Input` error if the file is missing, too large or of an unknown format.
/// - Returns a `Decode` error if the file cannot be decoded into rows.
pub async fn metrics(config: Config, args: MetricsArgs) -> Result<Out<MetricsResult>> {
    let records = load_records(&config, args.path(), args.format()).await?;
    let policy = config.policy(args.as_of());
    debug!("Using report policy {policy:?}");
    let result = MetricsResult::compute(records.data(), &policy);
    let message = format!(
        "Computed metrics for {} records as of {}{}",
        records.len(),
        policy.as_of(),
        issues_note(&records)
    );
    Ok(Out::new(message, result))
}

/// Reads and normalizes the subscription export described by `args`.
pub async fn normalize(config: Config, args: NormalizeArgs) -> Result<Out<Records>> {
    let records = load_records(&config, args.path(), args.format()).await?;
    let message = format!("Normalized {} records{}", records.len(), issues_note(&records));
    Ok(Out::new(message, records))
}

async fn load_records(
    config: &Config,
    path: &Path,
    format: Option<InputFormat>,
) -> Result<Records> {
    info!("Reading subscriptions from {}", path.display());
    let rows = read_rows(path, format, config.max_file_bytes()).await?;
    Ok(Records::parse(rows))
}

fn issues_note(records: &Records) -> String {
    match records.issues().len() {
        0 => String::new(),
        1 => ", 1 cell could not be parsed and was left empty".to_string(),
        n => format!(", {n} cells could not be parsed and were left empty"),
    }
}

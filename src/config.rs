//! Configuration file handling for submetrics.
//!
//! The configuration file is stored at `$SUBMETRICS_HOME/config.json` and holds the report
//! policy: the as-of date, the month range of the monthly series, which statuses count as churn,
//! the churn denominator, and the largest input file that will be accepted.
//!
//! The file is optional. When it is missing every setting takes its default.

use crate::error::{ErrorType, IntoResult, Res};
use crate::metrics::{default_churn_statuses, ChurnDenominator, MonthRange, ReportPolicy};
use crate::{utils, Result};
use anyhow::{bail, Context};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_NAME: &str = "submetrics";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$SUBMETRICS_HOME` and from there it loads `$SUBMETRICS_HOME/config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the home directory and writes a `config.json` with default settings.
    ///
    /// # Errors
    /// - Returns an error if `config.json` already exists and `force` is false.
    /// - Returns an error if any file operations fail.
    pub async fn create(dir: impl Into<PathBuf>, force: bool) -> Result<Self> {
        Self::create_inner(dir.into(), force)
            .await
            .context("Unable to create the home directory and config")
            .pub_result(ErrorType::Config)
    }

    /// Loads `config.json` from `home`. Defaults are used when the file does not exist.
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_inner(home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn create_inner(maybe_relative: PathBuf, force: bool) -> Res<Self> {
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the submetrics home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.is_file() && !force {
            bail!(
                "The config file already exists at '{}', use --force to overwrite it",
                config_path.display()
            );
        }

        let config_file = ConfigFile::default();
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            config_path,
            config_file,
        })
    }

    async fn load_inner(root: PathBuf) -> Res<Self> {
        let config_path = root.join(CONFIG_JSON);
        let config_file = if config_path.is_file() {
            ConfigFile::load(&config_path).await?
        } else {
            debug!(
                "No config file at '{}', using default settings",
                config_path.display()
            );
            ConfigFile::default()
        };
        Ok(Self {
            root,
            config_path,
            config_file,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.config_file.max_file_bytes
    }

    /// The report policy. `as_of` takes precedence over the configured date, and today is used
    /// when neither is given.
    pub fn policy(&self, as_of: Option<NaiveDate>) -> ReportPolicy {
        let policy = match as_of.or(self.config_file.as_of) {
            Some(date) => ReportPolicy::new(date),
            None => ReportPolicy::today(),
        };
        policy
            .with_month_range(self.config_file.month_range)
            .with_churn_statuses(self.config_file.churn_statuses.clone())
            .with_churn_denominator(self.config_file.churn_denominator)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "submetrics",
///   "config_version": 1,
///   "as_of": "2023-09-30",
///   "month_range": { "kind": "fixed", "start": "06-2022", "end": "12-2023" },
///   "churn_statuses": ["Cancelada", "Trial cancelado"],
///   "churn_denominator": "cohort_start",
///   "max_file_bytes": 10485760
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "submetrics"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The date treated as "now", today if not specified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    as_of: Option<NaiveDate>,

    #[serde(default)]
    month_range: MonthRange,

    #[serde(default = "default_churn_statuses")]
    churn_statuses: Vec<String>,

    #[serde(default)]
    churn_denominator: ChurnDenominator,

    #[serde(default = "default_max_file_bytes")]
    max_file_bytes: u64,
}

fn default_max_file_bytes() -> u64 {
    MAX_FILE_BYTES
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            as_of: None,
            month_range: MonthRange::default(),
            churn_statuses: default_churn_statuses(),
            churn_denominator: ChurnDenominator::default(),
            max_file_bytes: MAX_FILE_BYTES,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if it belongs to another app
    async fn load(path: &Path) -> Res<Self> {
        let config: ConfigFile = utils::deserialize(path)
            .await
            .context("Unable to load the config file")?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    async fn save(&self, path: &Path) -> Res<()> {
        utils::serialize(path, self)
            .await
            .context("Unable to write config file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_then_load() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("submetrics");
        let created = Config::create(&home, false).await.unwrap();
        assert!(created.config_path().is_file());

        let loaded = Config::load(created.root()).await.unwrap();
        assert_eq!(loaded.config_file, ConfigFile::default());
        assert_eq!(loaded.max_file_bytes(), MAX_FILE_BYTES);
    }

    #[tokio::test]
    async fn test_create_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let _ = Config::create(dir.path(), false).await.unwrap();
        assert!(Config::create(dir.path(), false).await.is_err());
        assert!(Config::create(dir.path(), true).await.is_ok());
    }

    #[tokio::test]
    async fn test_load_missing_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path().join("nowhere")).await.unwrap();
        assert_eq!(config.config_file, ConfigFile::default());
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_JSON);
        std::fs::write(
            &path,
            r#"{
                "app_name": "submetrics",
                "config_version": 1,
                "as_of": "2023-09-30",
                "month_range": {"kind": "fixed", "start": "06-2022", "end": "12-2023"},
                "churn_denominator": "cohort_start"
            }"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).await.unwrap();
        let policy = config.policy(None);
        assert_eq!(policy.as_of(), NaiveDate::from_ymd_opt(2023, 9, 30).unwrap());
        assert_eq!(policy.churn_denominator(), ChurnDenominator::CohortStart);
        assert_eq!(policy.churn_statuses(), &["Cancelada".to_string()]);
        assert_eq!(
            policy.month_range(),
            &MonthRange::Fixed {
                start: "06-2022".parse().unwrap(),
                end: "12-2023".parse().unwrap(),
            }
        );

        let override_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(config.policy(Some(override_date)).as_of(), override_date);
    }

    #[tokio::test]
    async fn test_load_wrong_app_name() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_JSON),
            r#"{"app_name": "tiller", "config_version": 1}"#,
        )
        .unwrap();
        let err = Config::load(dir.path()).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(format!("{:#}", err.internal()).contains("Invalid app_name"));
    }
}

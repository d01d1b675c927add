//! These structs provide the CLI interface for the submetrics CLI.

use crate::input::InputFormat;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// submetrics: Recurring-revenue and retention metrics from a subscription export.
///
/// Give it a spreadsheet export of subscriptions (CSV, or a JSON array of rows) and it computes
/// MRR, churn rate, LTV, ARPU, average subscription length and active users, along with monthly
/// series of MRR, active users, new users, churn and cancellations.
///
/// There is also a mode in which an AI agent can use this program through the mcp subcommand.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and a config.json with default settings.
    ///
    /// Running this is optional, every setting has a default. Edit the resulting config.json to
    /// set a fixed as-of date, a fixed month range, the statuses that count as churn or the churn
    /// denominator.
    Init(InitArgs),
    /// Compute the metrics of a subscription export and print them as JSON.
    Metrics(MetricsArgs),
    /// Normalize the rows of a subscription export and print the records, along with any cells
    /// that could not be parsed, as JSON.
    Normalize(NormalizeArgs),
    /// Run an MCP server over stdio so that an AI agent can compute metrics.
    Mcp(McpArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber EnvFilter documentation.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the submetrics configuration is held. Defaults to ~/submetrics
    #[arg(long, env = "SUBMETRICS_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// Args for the `submetrics init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// Overwrite an existing config.json.
    #[arg(long)]
    force: bool,
}

impl InitArgs {
    pub fn new(force: bool) -> Self {
        Self { force }
    }

    pub fn force(&self) -> bool {
        self.force
    }
}

/// Args for the `submetrics metrics` command.
#[derive(Debug, Parser, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "MetricsArgs")]
pub struct MetricsArgs {
    /// The path to the subscription export.
    #[arg(long = "file", short = 'f')]
    path: PathBuf,

    /// The format of the file, 'csv' or 'json'. Taken from the file extension when omitted.
    #[arg(long, value_enum)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format: Option<InputFormat>,

    /// The date treated as "now" for subscriptions without a cancellation date, as YYYY-MM-DD.
    /// Overrides the configured date. Defaults to today.
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    as_of: Option<NaiveDate>,
}

impl MetricsArgs {
    pub fn new(
        path: impl Into<PathBuf>,
        format: Option<InputFormat>,
        as_of: Option<NaiveDate>,
    ) -> Self {
        Self {
            path: path.into(),
            format,
            as_of,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Option<InputFormat> {
        self.format
    }

    pub fn as_of(&self) -> Option<NaiveDate> {
        self.as_of
    }
}

/// Args for the `submetrics normalize` command.
#[derive(Debug, Parser, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "NormalizeArgs")]
pub struct NormalizeArgs {
    /// The path to the subscription export.
    #[arg(long = "file", short = 'f')]
    path: PathBuf,

    /// The format of the file, 'csv' or 'json'. Taken from the file extension when omitted.
    #[arg(long, value_enum)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format: Option<InputFormat>,
}

impl NormalizeArgs {
    pub fn new(path: impl Into<PathBuf>, format: Option<InputFormat>) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Option<InputFormat> {
        self.format
    }
}

/// Args for the `submetrics mcp` command.
#[derive(Debug, Parser, Clone)]
pub struct McpArgs {}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("submetrics"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or SUBMETRICS_HOME instead of relying on the default \
                home directory.",
            );
            PathBuf::from("submetrics")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

//! Command handlers for the submetrics CLI.
//!
//! This module contains implementations for all CLI subcommands. The same handlers back the MCP
//! tools.

mod init;
mod mcp;
mod metrics;

use serde::Serialize;
use std::fmt::Debug;
use tracing::{error, info};

pub use init::init;
pub use mcp::mcp;
pub use metrics::{metrics, normalize};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data to both the command line and MCP server interfaces.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to stdout.
    /// Logs go to stderr, so stdout holds nothing but the JSON.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(json) = self.structure_json() {
            println!("{json}");
        }
    }

    /// The structured data as pretty JSON. `None` when there is none or it cannot be serialized,
    /// in which case the failure is logged as an error.
    fn structure_json(&self) -> Option<String> {
        let structure = self.structure()?;
        match serde_json::to_string_pretty(structure) {
            Ok(json) => Some(json),
            Err(e) => {
                error!("Unable to serialize the command output: {e}");
                None
            }
        }
    }
}

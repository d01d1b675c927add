//! Error types for submetrics.
//!
//! Internally everything is an `anyhow::Error` (see [`Res`]) so that context can be attached
//! freely while an error travels up the stack. At the boundary of a command the internal error is
//! converted into the public [`Error`] with [`IntoResult::pub_result`]. The public error carries an
//! [`ErrorType`] which decides the message that is shown to the user. The internal chain is logged
//! for diagnostics and kept as the error `source`, but it is never part of the `Display` output
//! for decode failures.
//!
//! Problems with individual rows (an unparseable date, a non-numeric value) are never errors; they
//! are recovered by the normalizer and reported as `RowIssue`s next to the records.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use tracing::{debug, error};

/// The internal result type.
pub(crate) type Res<T> = std::result::Result<T, anyhow::Error>;

/// The public result type.
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of terminal failure that ended a command.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The configuration could not be created, read or understood.
    Config,
    /// The input file could not be read, or was rejected before decoding (e.g. it is too large).
    Input,
    /// The input file was read but could not be decoded into rows.
    Decode,
    /// The MCP service failed.
    Service,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

impl ErrorType {
    fn user_message(&self) -> &'static str {
        match self {
            ErrorType::Config => "There is a problem with the submetrics configuration",
            ErrorType::Input => "The input file could not be used",
            ErrorType::Decode => {
                "Error processing the uploaded file. Please check that the file format is \
                correct and try again."
            }
            ErrorType::Service => "The MCP service encountered an error",
        }
    }

    /// Whether the outermost context message of the internal error is safe and useful to show.
    fn shows_detail(&self) -> bool {
        matches!(self, ErrorType::Config | ErrorType::Input)
    }
}

/// The public error type.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub(crate) fn new(error_type: ErrorType, inner: anyhow::Error) -> Self {
        Self { error_type, inner }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// The internal error chain. Use this for diagnostics only.
    pub fn internal(&self) -> &anyhow::Error {
        &self.inner
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.error_type.shows_detail() {
            // `{}` on anyhow::Error only prints the outermost context
            write!(f, "{}: {}", self.error_type.user_message(), self.inner)
        } else {
            f.write_str(self.error_type.user_message())
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error({}): {:?}", self.error_type, self.inner)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.inner)
    }
}

/// Converts an internal result into a public result, logging the internal error chain.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for Res<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| {
            error!("{error_type} failure: {e:#}");
            debug!("{e:?}");
            Error::new(error_type, e)
        })
    }
}

//! submetrics computes recurring-revenue and retention metrics from subscription spreadsheet
//! exports. Rows are normalized into `SubscriptionRecord`s and aggregated into a `MetricsResult`.

pub mod args;
pub mod commands;
mod config;
mod error;
pub mod input;
mod mcp;
pub mod metrics;
pub mod model;
mod utils;


pub use config::Config;
pub use error::{Error, ErrorType, Result};

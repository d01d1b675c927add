//! The MCP tools, which wrap the CLI command handlers.

use crate::args::{MetricsArgs, NormalizeArgs};
use crate::commands;
use crate::mcp::mcp_utils::tool_result;
use crate::mcp::MetricsServer;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use rmcp::{tool, tool_router};
use tracing::info;

#[tool_router(vis = "pub(super)")]
impl MetricsServer {
    #[tool]
    /// Initialize the submetrics MCP service for this session and return usage instructions. You
    /// **MUST** call this **ONCE** before using other tools so that you have the full usage
    /// instructions. You **MAY** call it more than once if you have forgotten the usage
    /// instructions.
    async fn initialize_service(&self) -> Result<CallToolResult, McpError> {
        let mut initialized = self.initialized.lock().await;
        *initialized = true;
        Ok(CallToolResult::success(vec![rmcp::model::Content::text(
            include_str!("docs/INSTRUCTIONS.md"),
        )]))
    }

    /// Compute recurring-revenue and retention metrics from a subscription export on the local
    /// file system.
    ///
    /// # Parameters
    ///
    /// - `path`: The path to the export, a `.csv` file with a header row or a `.json` file holding
    ///   an array of row objects.
    /// - `format`: Optional, `csv` or `json`. Taken from the file extension when omitted.
    /// - `as_of`: Optional, `YYYY-MM-DD`. The date treated as "now" for subscriptions without a
    ///   cancellation date. Defaults to the configured date, or today.
    ///
    /// # Returns
    ///
    /// A message and a JSON object with `mrr`, `churnRate`, `ltv`, `arpu`,
    /// `averageSubscriptionLengthDays`, `activeUsers`, `totalRecords` and the month-keyed maps
    /// `mrrByMonth`, `usersByMonth`, `newUsersByMonth`, `churnByMonth` and
    /// `cancellationsByMonth`. Month keys look like `01-2023`.
    #[tool]
    async fn compute_metrics(
        &self,
        Parameters(args): Parameters<MetricsArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: compute_metrics called for {}", args.path().display());
        let config = (*self.config).clone();
        let out = commands::metrics(config, args).await;
        tool_result(out)
    }

    /// Normalize the rows of a subscription export without computing metrics. Use this to check
    /// how headers, dates and values were understood.
    ///
    /// # Parameters
    ///
    /// - `path`: The path to the export, `.csv` or `.json`.
    /// - `format`: Optional, `csv` or `json`. Taken from the file extension when omitted.
    ///
    /// # Returns
    ///
    /// A message and a JSON object with `data`, the normalized records keyed by canonical field
    /// names such as `dataInicio`, and `issues`, the cells that could not be parsed along with
    /// their row number, field and raw text.
    #[tool]
    async fn normalize_rows(
        &self,
        Parameters(args): Parameters<NormalizeArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: normalize_rows called for {}", args.path().display());
        let config = (*self.config).clone();
        let out = commands::normalize(config, args).await;
        tool_result(out)
    }
}

//! MCP (Model Context Protocol) server implementation.
//!
//! This module provides an MCP server that exposes the submetrics commands as tools for AI agent
//! integration. The server communicates via JSON-RPC over stdio.

/// Checks if the server has been initialized and returns an error if not.
macro_rules! require_init {
    ($self:expr) => {
        if !$self.check_initialized().await {
            return Self::uninitialized();
        }
    };
}

mod mcp_utils;
mod tools;

use crate::Config;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{
    CallToolResult, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::transport::stdio;
use rmcp::ErrorData as McpError;
use rmcp::{tool_handler, ServerHandler, ServiceExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// The submetrics MCP server.
#[derive(Debug, Clone)]
pub struct MetricsServer {
    initialized: Arc<Mutex<bool>>,
    config: Arc<Config>,
    tool_router: ToolRouter<MetricsServer>,
}

impl MetricsServer {
    /// Creates a new MetricsServer with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            initialized: Arc::new(Mutex::new(false)),
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }

    async fn check_initialized(&self) -> bool {
        *self.initialized.lock().await
    }

    fn uninitialized() -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::error(vec![rmcp::model::Content::text(
            "You have not yet initialized the service. Please call __initialize_service__ first.",
        )]))
    }
}

#[tool_handler]
impl ServerHandler for MetricsServer {
    /// Returns server information sent to the MCP client during initialization. Agents tend to
    /// skim `instructions`, so the full usage text is only returned by `initialize_service`.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "submetrics".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(include_str!("docs/INTRO.md").into()),
        }
    }
}

/// Transport type for the MCP server.
#[derive(Debug, Default)]
pub(crate) enum Io {
    #[default]
    Stdio,
    /// Mock transport for testing - holds one end of a duplex channel.
    #[cfg(test)]
    Mock(tokio::io::DuplexStream),
}

/// Runs the MCP server with stdio transport or mock transport. This function starts the MCP server
/// and blocks until the client disconnects or an error occurs.
pub(crate) async fn run_server(config: Config, io: Io) -> crate::Result<()> {
    use crate::error::{ErrorType, IntoResult};
    let server = MetricsServer::new(config);
    info!("Starting MCP server...");

    let service = match io {
        Io::Stdio => server
            .serve(stdio())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e}"))
            .pub_result(ErrorType::Service)?,
        #[cfg(test)]
        Io::Mock(stream) => server
            .serve(stream)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e}"))
            .pub_result(ErrorType::Service)?,
    };

    info!("MCP server running, waiting for requests...");

    service
        .waiting()
        .await
        .map_err(|e| anyhow::anyhow!("MCP server error: {e}"))
        .pub_result(ErrorType::Service)?;

    info!("MCP server shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;
    use rmcp::model::{CallToolRequestParam, CallToolResult};
    use rmcp::ServiceExt;
    use tokio::io::duplex;

    fn texts(result: &CallToolResult) -> Vec<String> {
        result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect()
    }

    /// Integration test for the MCP server using an in-memory transport.
    #[tokio::test]
    async fn test_mcp_server_integration() {
        let (client_io, server_io) = duplex(4096);
        let env = TestEnv::new().await;
        let path = env
            .write_file(
                "export.csv",
                "Status,Valor,Data Início\nAtiva,100,15/11/2022 08:00\nCancelada,50,\n",
            )
            .await;
        let config = env.config();

        let server_handle =
            tokio::spawn(async move { run_server(config, Io::Mock(server_io)).await });

        let client = ().serve(client_io).await.expect("Failed to create client");

        let mut args = serde_json::Map::new();
        args.insert(
            "path".into(),
            serde_json::Value::String(path.to_string_lossy().into_owned()),
        );
        args.insert("as_of".into(), serde_json::Value::String("2023-01-31".into()));

        // Tools refuse to run before the service is initialized
        let early = client
            .call_tool(CallToolRequestParam {
                name: "compute_metrics".into(),
                arguments: Some(args.clone()),
            })
            .await
            .expect("compute_metrics call failed");
        assert!(early.is_error.unwrap_or(false));

        let init_result = client
            .call_tool(CallToolRequestParam {
                name: "initialize_service".into(),
                arguments: None,
            })
            .await
            .expect("initialize_service call failed");
        assert!(
            !init_result.is_error.unwrap_or(false),
            "initialize_service returned error: {:?}",
            init_result.content
        );

        let metrics_result = client
            .call_tool(CallToolRequestParam {
                name: "compute_metrics".into(),
                arguments: Some(args.clone()),
            })
            .await
            .expect("compute_metrics call failed");
        assert!(
            !metrics_result.is_error.unwrap_or(false),
            "compute_metrics returned error: {:?}",
            metrics_result.content
        );
        let content = texts(&metrics_result);
        assert_eq!(content[0], "Computed metrics for 2 records as of 2023-01-31");
        let json: serde_json::Value = serde_json::from_str(&content[1]).unwrap();
        assert_eq!(json["mrr"], "100.00");
        assert_eq!(json["churnRate"], "50.00%");
        assert_eq!(json["activeUsers"], 1);

        let normalize_result = client
            .call_tool(CallToolRequestParam {
                name: "normalize_rows".into(),
                arguments: Some(args),
            })
            .await
            .expect("normalize_rows call failed");
        assert!(
            !normalize_result.is_error.unwrap_or(false),
            "normalize_rows returned error: {:?}",
            normalize_result.content
        );

        let mut missing = serde_json::Map::new();
        missing.insert(
            "path".into(),
            serde_json::Value::String(env.home().join("missing.csv").to_string_lossy().into()),
        );
        let missing_result = client
            .call_tool(CallToolRequestParam {
                name: "compute_metrics".into(),
                arguments: Some(missing),
            })
            .await
            .expect("compute_metrics call failed");
        assert!(missing_result.is_error.unwrap_or(false));

        drop(client);

        let server_result = tokio::time::timeout(std::time::Duration::from_secs(5), server_handle)
            .await
            .expect("Server timed out")
            .expect("Server task panicked");
        assert!(
            server_result.is_ok(),
            "Server returned error: {:?}",
            server_result
        );
    }

    #[tokio::test]
    async fn test_mcp_lists_tools() {
        let (client_io, server_io) = duplex(4096);
        let env = TestEnv::new().await;
        let config = env.config();
        let _server_handle =
            tokio::spawn(async move { run_server(config, Io::Mock(server_io)).await });
        let client = ().serve(client_io).await.expect("Failed to create client");

        let tools = client
            .list_tools(Default::default())
            .await
            .expect("Failed to list tools");
        let mut names: Vec<String> = tools.tools.iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec!["compute_metrics", "initialize_service", "normalize_rows"]
        );
    }
}

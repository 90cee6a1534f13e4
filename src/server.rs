//! MCP server implementation using rmcp.
//!
//! Exposes the tool registry over MCP stdio. Tool calls go through the same
//! direct-invocation path as the JSON-RPC `call_tool` method.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::ServiceExt;
use rmcp::transport::stdio;
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::*,
    service::{RequestContext, RoleServer},
};
use tracing::info;

use crate::orchestrator::Orchestrator;

/// MCP server that delegates tool calls to the orchestrator.
#[derive(Clone)]
pub struct McpServer {
    orchestrator: Arc<Orchestrator>,
}

impl McpServer {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Run one tool and fold the outcome into an MCP tool result.
    ///
    /// Tool failures are reported in-band as error results, not protocol
    /// errors, so the client model can read and react to them.
    pub async fn run_tool(&self, name: &str, arguments: JsonObject) -> CallToolResult {
        match self.orchestrator.executor().call_tool(name, arguments).await {
            Ok(value) => CallToolResult::success(vec![Content::text(value.to_string())]),
            Err(e) => CallToolResult::error(vec![Content::text(e.to_string())]),
        }
    }
}

impl ServerHandler for McpServer {
    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let result = ListToolsResult {
            tools: self.orchestrator.registry().list_tools(),
            next_cursor: None,
            ..Default::default()
        };
        std::future::ready(Ok(result))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        let tool_name = request.name.to_string();
        let args = request.arguments.unwrap_or_default();

        async move { Ok(self.run_tool(&tool_name, args).await) }
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Docker automation tools: create networks, volumes and containers, \
                 start containers and pull images."
                    .to_string(),
            ),
        }
    }
}

/// Serve MCP over stdin/stdout until the client disconnects.
pub async fn serve_stdio(server: McpServer) -> Result<()> {
    info!(
        tools = server.orchestrator.registry().len(),
        "Starting MCP stdio server"
    );
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    info!("MCP stdio server session ended");
    Ok(())
}

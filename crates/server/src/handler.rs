//! MCP server handler implementation.
//!
//! This module defines the main server handler that routes tool calls
//! to the appropriate implementations. The handler owns the query
//! orchestrator and configuration, constructed once in `main`.

use crate::orchestrator::QueryOrchestrator;
use crate::tools::activity_prompt::{ActivityPromptParams, prompt_impl};
use crate::tools::cache::{CacheStatsParams, stats_impl};
use crate::tools::table_query::{TableQueryParams, query_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use tablecache_client::SourceClient;
use tablecache_core::AppConfig;

/// The main MCP server handler for mcp-table.
#[derive(Clone)]
pub struct McpTableServer {
    orchestrator: QueryOrchestrator<SourceClient>,
    config: AppConfig,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl McpTableServer {
    /// Create a new server handler owning the injected components.
    pub fn new(orchestrator: QueryOrchestrator<SourceClient>, config: AppConfig) -> Self {
        Self { orchestrator, config, tool_router: Self::tool_router() }
    }

    /// Resolve a filtered table query through the read-through cache.
    #[tool(
        description = "Query a table with optional column filters. Serves from the whole-table snapshot cache, fetching and caching on a miss."
    )]
    async fn table_query(&self, params: Parameters<TableQueryParams>) -> Result<CallToolResult, McpError> {
        query_impl(&self.orchestrator, &self.config.default_schema, params.0).await
    }

    /// Look up an activity and assemble its prompt text for one slide.
    #[tool(description = "Fetch an activity's prompt row and build the full prompt text for the given slide index.")]
    async fn activity_prompt(&self, params: Parameters<ActivityPromptParams>) -> Result<CallToolResult, McpError> {
        prompt_impl(&self.orchestrator, params.0).await
    }

    /// Report cached snapshot keys, record counts, TTLs, and sizes.
    #[tool(description = "List cached table snapshots with record count, remaining TTL, and serialized size per key.")]
    async fn cache_stats(&self, params: Parameters<CacheStatsParams>) -> Result<CallToolResult, McpError> {
        stats_impl(self.orchestrator.db(), params.0).await
    }
}

impl ServerHandler for McpTableServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-table".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

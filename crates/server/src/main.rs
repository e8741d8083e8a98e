//! mcp-table server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use tablecache_client::{SourceClient, SourceConfig};
use tablecache_core::{AppConfig, CacheDb};

mod handler;
mod orchestrator;
mod tools;

use orchestrator::QueryOrchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    // Startup errors are the only fatal ones; everything after this
    // point is converted into a uniform error response.
    let config = AppConfig::load()?;
    let db = CacheDb::open(&config.db_path).await?;
    let source = SourceClient::new(SourceConfig {
        base_url: config.require_source_url()?.to_string(),
        api_key: config.source_api_key.clone(),
        timeout: config.timeout(),
        user_agent: config.user_agent.clone(),
    })?;

    tracing::info!("Starting mcp-table server on stdio transport");

    let handler = handler::McpTableServer::new(QueryOrchestrator::new(db, source), config);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

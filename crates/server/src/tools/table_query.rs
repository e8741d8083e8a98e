//! table_query tool implementation.
//!
//! Resolves a filtered table query through the read-through cache.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tablecache_client::TableSource;
use tablecache_core::{Error, Filter};

use crate::orchestrator::QueryOrchestrator;

/// Input parameters for table_query tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TableQueryParams {
    /// Schema name; defaults to the configured default schema.
    #[serde(default)]
    pub schema: Option<String>,

    /// Table name (required).
    pub table: String,

    /// Column filters, ANDed together. Each value is either a bare
    /// scalar (loose equality) or an `{"operator": ..., "value": ...}`
    /// pair.
    #[serde(default)]
    pub filters: Option<Filter>,

    /// Comma-separated column projection (default: all columns).
    #[serde(default)]
    pub columns: Option<String>,
}

/// Implementation of the table_query tool.
///
/// The response is the resolved result set: filtered records, snapshot
/// and filtered counts, and the provenance tag.
pub async fn query_impl<S: TableSource>(
    orchestrator: &QueryOrchestrator<S>, default_schema: &str, params: TableQueryParams,
) -> Result<CallToolResult, McpError> {
    if params.table.is_empty() {
        return Err(Error::InvalidInput("table cannot be empty".into()).into());
    }

    let schema = params.schema.as_deref().unwrap_or(default_schema);
    let filter = params.filters.unwrap_or_default();
    let columns = params.columns.as_deref().unwrap_or("*");

    let result = orchestrator.resolve(schema, &params.table, &filter, columns).await?;

    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

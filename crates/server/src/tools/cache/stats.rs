//! cache_stats tool implementation.
//!
//! Enumerates fresh cache entries matching the whole-table naming
//! convention and reports record count, remaining TTL, and serialized
//! size per key. Diagnostics only — the query path never uses this.

use chrono::{DateTime, Utc};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tablecache_core::{CacheDb, Error};

/// Parameters for the cache_stats tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatsParams {
    /// SQL LIKE pattern over cache keys (default: whole-table entries).
    #[serde(default)]
    pub pattern: Option<String>,
}

/// One reported cache entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatsEntry {
    pub key: String,
    pub record_count: i64,
    pub ttl_remaining_secs: i64,
    pub size_bytes: i64,
}

/// Output from the cache_stats tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatsOutput {
    pub entries: Vec<CacheStatsEntry>,
    pub count: usize,
}

/// Implementation of the cache_stats tool.
pub async fn stats_impl(cache: &CacheDb, params: CacheStatsParams) -> Result<CallToolResult, McpError> {
    let pattern = params.pattern.unwrap_or_else(|| "%:ALL_DATA".to_string());

    let now = Utc::now();
    let entries: Vec<CacheStatsEntry> = cache
        .list_entries(&pattern)
        .await?
        .into_iter()
        .map(|meta| CacheStatsEntry {
            ttl_remaining_secs: DateTime::parse_from_rfc3339(&meta.expires_at)
                .map(|expiry| (expiry.with_timezone(&Utc) - now).num_seconds().max(0))
                .unwrap_or(0),
            key: meta.key,
            record_count: meta.record_count,
            size_bytes: meta.size_bytes,
        })
        .collect();

    let output = CacheStatsOutput { count: entries.len(), entries };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tablecache_core::cache::table_key;

    fn parse_output(result: &CallToolResult) -> CacheStatsOutput {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_stats_empty_cache() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let result = stats_impl(&cache, CacheStatsParams::default()).await.unwrap();

        let output = parse_output(&result);
        assert_eq!(output.count, 0);
        assert!(output.entries.is_empty());
    }

    #[tokio::test]
    async fn test_stats_reports_table_entries() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let records: Vec<tablecache_core::Record> =
            serde_json::from_value(json!([{"a": 1}, {"a": 2}])).unwrap();
        cache
            .put_table(&table_key("prompt_info", "activity_prompts"), &records, 600)
            .await
            .unwrap();

        let result = stats_impl(&cache, CacheStatsParams::default()).await.unwrap();
        let output = parse_output(&result);

        assert_eq!(output.count, 1);
        let entry = &output.entries[0];
        assert_eq!(entry.key, "prompt_info.activity_prompts:ALL_DATA");
        assert_eq!(entry.record_count, 2);
        assert!(entry.ttl_remaining_secs > 0 && entry.ttl_remaining_secs <= 600);
        assert!(entry.size_bytes > 0);
    }

    #[tokio::test]
    async fn test_stats_default_pattern_excludes_row_entries() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let records: Vec<tablecache_core::Record> = serde_json::from_value(json!([{"a": 1}])).unwrap();
        cache.put_table("prompt_info.activity_prompts:5", &records, 120).await.unwrap();

        let result = stats_impl(&cache, CacheStatsParams::default()).await.unwrap();
        assert_eq!(parse_output(&result).count, 0);

        let params = CacheStatsParams { pattern: Some("prompt_info.%".to_string()) };
        let result = stats_impl(&cache, params).await.unwrap();
        assert_eq!(parse_output(&result).count, 1);
    }
}

//! Query orchestration: read-through whole-table cache resolution.
//!
//! The orchestrator decides cache-hit vs cache-miss for one logical
//! table, triggers fetch-and-populate on a miss, applies the predicate
//! evaluator, and performs one fallback fetch when a query's table comes
//! back empty. Caching the entire table rather than per-query result
//! sets keeps the key space small and guarantees that every served row
//! came from one consistent fetch; very large tables are unsuitable for
//! this strategy.
//!
//! Calls within one resolution are awaited sequentially. Concurrent
//! misses for the same key may each fetch and populate independently;
//! last writer wins.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tablecache_client::TableSource;
use tablecache_core::cache::{ROW_TTL_SECS, TABLE_TTL_SECS, row_key, table_key};
use tablecache_core::record::value_text;
use tablecache_core::{CacheDb, Condition, Error, Filter, Record, evaluate};

/// Fallback reference table, fetched once when a query's table is empty.
const FALLBACK_SCHEMA: &str = "prompt_info";
const FALLBACK_TABLE: &str = "activity_prompts";

/// Which path produced the records in a result.
///
/// Callers use this for observability, not for correctness branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Served from an unexpired cached snapshot.
    CacheFiltered,
    /// Fetched from the source on a cache miss.
    SourceFiltered,
    /// Served from the fallback reference table after an empty fetch.
    FallbackFiltered,
}

/// A resolved, filtered query result.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResultSet {
    /// The filtered records.
    pub data: Vec<Record>,
    /// Unfiltered record count of the snapshot consulted.
    pub total_records: usize,
    /// Number of records after filtering.
    pub filtered_records: usize,
    /// Which path produced the records.
    pub provenance: Provenance,
}

/// The central query coordinator.
///
/// Owns the cache handle and the source connector; constructed once in
/// the composition root and shared by all tools.
#[derive(Clone)]
pub struct QueryOrchestrator<S> {
    db: CacheDb,
    source: S,
    table_ttl_secs: i64,
    row_ttl_secs: i64,
}

impl<S: TableSource> QueryOrchestrator<S> {
    /// Create an orchestrator with the standard TTL policy.
    pub fn new(db: CacheDb, source: S) -> Self {
        Self { db, source, table_ttl_secs: TABLE_TTL_SECS, row_ttl_secs: ROW_TTL_SECS }
    }

    /// The cache handle, for the diagnostics surface.
    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Resolve a table query against the cache, the source, or the
    /// fallback reference table.
    ///
    /// Cache probe first; a hit is filtered and returned even when the
    /// filtered result is empty. On a miss the whole table is fetched,
    /// cached for the table TTL, and filtered. A fetch that succeeds
    /// with zero records triggers exactly one fallback fetch of the
    /// reference table; a fetch failure propagates without fallback.
    pub async fn resolve(&self, schema: &str, table: &str, filter: &Filter, columns: &str) -> Result<ResultSet, Error> {
        let key = table_key(schema, table);

        match self.db.get_table(&key).await {
            Ok(Some(snapshot)) => {
                tracing::debug!("cache hit for {}", key);
                return Ok(Self::filtered(snapshot, filter, Provenance::CacheFiltered));
            }
            Ok(None) => {}
            // Cache failures degrade to a miss, never fail the caller.
            Err(e) => tracing::warn!("cache read failed for {}: {}", key, e),
        }

        let snapshot = self
            .source
            .fetch_table(schema, table, columns)
            .await
            .map_err(|e| Error::SourceUnavailable(e.to_string()))?;

        if snapshot.is_empty() {
            tracing::debug!("empty fetch for {}.{}, trying fallback table", schema, table);
            return self.resolve_fallback(filter).await;
        }

        if let Err(e) = self.db.put_table(&key, &snapshot, self.table_ttl_secs).await {
            tracing::warn!("failed to cache snapshot for {}: {}", key, e);
        }

        Ok(Self::filtered(snapshot, filter, Provenance::SourceFiltered))
    }

    /// Point lookup of rows matching one id column.
    ///
    /// Row entries live under their own short-TTL keys; on a miss the
    /// lookup delegates to a whole-table resolution with an equality
    /// filter and caches the filtered rows best-effort.
    pub async fn resolve_row(&self, schema: &str, table: &str, id_column: &str, id: &Value) -> Result<ResultSet, Error> {
        let key = row_key(schema, table, &value_text(id));

        match self.db.get_table(&key).await {
            Ok(Some(rows)) => {
                tracing::debug!("cache hit for {}", key);
                return Ok(ResultSet {
                    total_records: rows.len(),
                    filtered_records: rows.len(),
                    data: rows,
                    provenance: Provenance::CacheFiltered,
                });
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("cache read failed for {}: {}", key, e),
        }

        let mut filter = Filter::new();
        filter.insert(id_column.to_string(), Condition::Scalar(id.clone()));
        let result = self.resolve(schema, table, &filter, "*").await?;

        if let Err(e) = self.db.put_table(&key, &result.data, self.row_ttl_secs).await {
            tracing::warn!("failed to cache row entry for {}: {}", key, e);
        }

        Ok(result)
    }

    /// One fetch of the fixed reference table; no recursive chaining.
    async fn resolve_fallback(&self, filter: &Filter) -> Result<ResultSet, Error> {
        let snapshot = self
            .source
            .fetch_table(FALLBACK_SCHEMA, FALLBACK_TABLE, "*")
            .await
            .map_err(|e| Error::SourceUnavailable(e.to_string()))?;

        let key = table_key(FALLBACK_SCHEMA, FALLBACK_TABLE);
        if let Err(e) = self.db.put_table(&key, &snapshot, self.table_ttl_secs).await {
            tracing::warn!("failed to cache fallback snapshot: {}", e);
        }

        Ok(Self::filtered(snapshot, filter, Provenance::FallbackFiltered))
    }

    fn filtered(snapshot: Vec<Record>, filter: &Filter, provenance: Provenance) -> ResultSet {
        let data = evaluate(&snapshot, filter);
        ResultSet { total_records: snapshot.len(), filtered_records: data.len(), data, provenance }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tablecache_client::SourceError;

    /// In-memory source keyed by "schema.table", counting fetches.
    #[derive(Default)]
    struct StubSource {
        tables: Mutex<HashMap<String, Vec<Record>>>,
        calls: AtomicUsize,
        fail_all: bool,
        fail_fallback: bool,
    }

    impl StubSource {
        fn with_table(self, schema: &str, table: &str, rows: Value) -> Self {
            let records: Vec<Record> = serde_json::from_value(rows).unwrap();
            self.tables.lock().unwrap().insert(format!("{schema}.{table}"), records);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TableSource for &StubSource {
        async fn fetch_table(&self, schema: &str, table: &str, _columns: &str) -> Result<Vec<Record>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_all {
                return Err(SourceError::HttpError { status: 503 });
            }
            if self.fail_fallback && table == FALLBACK_TABLE {
                return Err(SourceError::HttpError { status: 503 });
            }
            Ok(self
                .tables
                .lock()
                .unwrap()
                .get(&format!("{schema}.{table}"))
                .cloned()
                .unwrap_or_default())
        }
    }

    async fn orchestrator(source: &StubSource) -> QueryOrchestrator<&StubSource> {
        QueryOrchestrator::new(CacheDb::open_in_memory().await.unwrap(), source)
    }

    #[tokio::test]
    async fn test_miss_then_hit_determinism() {
        let source = StubSource::default().with_table("public", "activities", json!([{"a": 1}, {"a": 2}]));
        let orch = orchestrator(&source).await;
        let filter = Filter::new();

        let first = orch.resolve("public", "activities", &filter, "*").await.unwrap();
        assert_eq!(first.provenance, Provenance::SourceFiltered);
        assert_eq!(first.total_records, 2);

        let second = orch.resolve("public", "activities", &filter, "*").await.unwrap();
        assert_eq!(second.provenance, Provenance::CacheFiltered);
        assert_eq!(second.data, first.data);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_filtered_empty_hit_does_not_refetch() {
        let source = StubSource::default().with_table("public", "activities", json!([{"a": 1}]));
        let orch = orchestrator(&source).await;

        orch.resolve("public", "activities", &Filter::new(), "*").await.unwrap();

        let filter: Filter = serde_json::from_value(json!({"a": 99})).unwrap();
        let result = orch.resolve("public", "activities", &filter, "*").await.unwrap();
        assert_eq!(result.provenance, Provenance::CacheFiltered);
        assert!(result.data.is_empty());
        assert_eq!(result.total_records, 1);
        assert_eq!(result.filtered_records, 0);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_hit_applies_filter() {
        let source = StubSource::default().with_table("public", "activities", json!([{"a": 1}, {"a": 2}, {"a": 3}]));
        let orch = orchestrator(&source).await;

        orch.resolve("public", "activities", &Filter::new(), "*").await.unwrap();

        let filter: Filter = serde_json::from_value(json!({"a": {"operator": "gte", "value": 2}})).unwrap();
        let result = orch.resolve("public", "activities", &filter, "*").await.unwrap();
        assert_eq!(result.filtered_records, 2);
        assert_eq!(result.total_records, 3);
        assert_eq!(result.provenance, Provenance::CacheFiltered);
    }

    #[tokio::test]
    async fn test_ttl_expiry_triggers_refetch() {
        let source = StubSource::default().with_table("public", "activities", json!([{"a": 1}]));
        let orch = QueryOrchestrator {
            db: CacheDb::open_in_memory().await.unwrap(),
            source: &source,
            table_ttl_secs: 1,
            row_ttl_secs: 1,
        };

        orch.resolve("public", "activities", &Filter::new(), "*").await.unwrap();
        assert_eq!(source.calls(), 1);

        tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

        let result = orch.resolve("public", "activities", &Filter::new(), "*").await.unwrap();
        assert_eq!(result.provenance, Provenance::SourceFiltered);
        assert_eq!(source.calls(), 2);

        // Repopulated: the next call is a hit again.
        let result = orch.resolve("public", "activities", &Filter::new(), "*").await.unwrap();
        assert_eq!(result.provenance, Provenance::CacheFiltered);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_fallback_on_empty_fetch() {
        let source = StubSource::default()
            .with_table("public", "x", json!([]))
            .with_table(FALLBACK_SCHEMA, FALLBACK_TABLE, json!([{"activity_id": 1}, {"activity_id": 2}]));
        let orch = orchestrator(&source).await;

        let result = orch.resolve("public", "x", &Filter::new(), "*").await.unwrap();
        assert_eq!(result.provenance, Provenance::FallbackFiltered);
        assert_eq!(result.total_records, 2);
        assert_eq!(source.calls(), 2);

        // The fallback table's own key was populated, not the empty table's.
        let fallback_key = table_key(FALLBACK_SCHEMA, FALLBACK_TABLE);
        assert!(orch.db.get_table(&fallback_key).await.unwrap().is_some());
        assert!(orch.db.get_table(&table_key("public", "x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fallback_applies_filter() {
        let source = StubSource::default()
            .with_table(FALLBACK_SCHEMA, FALLBACK_TABLE, json!([{"activity_id": 1}, {"activity_id": 2}]));
        let orch = orchestrator(&source).await;

        let filter: Filter = serde_json::from_value(json!({"activity_id": 2})).unwrap();
        let result = orch.resolve("public", "missing", &filter, "*").await.unwrap();
        assert_eq!(result.provenance, Provenance::FallbackFiltered);
        assert_eq!(result.filtered_records, 1);
    }

    #[tokio::test]
    async fn test_source_error_propagates_without_fallback() {
        let source = StubSource { fail_all: true, ..Default::default() };
        let orch = orchestrator(&source).await;

        let result = orch.resolve("public", "activities", &Filter::new(), "*").await;
        assert!(matches!(result, Err(Error::SourceUnavailable(_))));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_error_propagates() {
        let source = StubSource { fail_fallback: true, ..Default::default() }.with_table("public", "x", json!([]));
        let orch = orchestrator(&source).await;

        let result = orch.resolve("public", "x", &Filter::new(), "*").await;
        assert!(matches!(result, Err(Error::SourceUnavailable(_))));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_resolve_row_caches_point_lookup() {
        let source = StubSource::default().with_table(
            FALLBACK_SCHEMA,
            FALLBACK_TABLE,
            json!([{"activity_id": 5, "pre_prompt": "A"}, {"activity_id": 6, "pre_prompt": "B"}]),
        );
        let orch = orchestrator(&source).await;

        let first = orch
            .resolve_row(FALLBACK_SCHEMA, FALLBACK_TABLE, "activity_id", &json!(5))
            .await
            .unwrap();
        assert_eq!(first.filtered_records, 1);
        assert_eq!(first.data[0]["pre_prompt"], json!("A"));
        assert_eq!(source.calls(), 1);

        let second = orch
            .resolve_row(FALLBACK_SCHEMA, FALLBACK_TABLE, "activity_id", &json!(5))
            .await
            .unwrap();
        assert_eq!(second.provenance, Provenance::CacheFiltered);
        assert_eq!(second.data, first.data);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_resolve_row_coerces_id() {
        let source = StubSource::default().with_table(
            FALLBACK_SCHEMA,
            FALLBACK_TABLE,
            json!([{"activity_id": "5", "pre_prompt": "A"}]),
        );
        let orch = orchestrator(&source).await;

        let result = orch
            .resolve_row(FALLBACK_SCHEMA, FALLBACK_TABLE, "activity_id", &json!(5))
            .await
            .unwrap();
        assert_eq!(result.filtered_records, 1);
    }
}

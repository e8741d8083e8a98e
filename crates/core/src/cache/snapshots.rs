//! Snapshot store operations.
//!
//! Entries are flat key→serialized-array rows with a per-entry expiry.
//! Expiration is lazy: reads skip stale rows and the next put overwrites
//! them; nothing sweeps the table.

use super::connection::CacheDb;
use crate::Error;
use crate::record::Record;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Diagnostics metadata for one cache entry.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheEntryMeta {
    pub key: String,
    pub record_count: i64,
    pub expires_at: String,
    pub size_bytes: i64,
}

impl CacheDb {
    /// Get a cached snapshot if present and unexpired.
    ///
    /// Returns None for a missing or expired key. A stored payload that
    /// no longer deserializes is a `CorruptEntry` error; callers on the
    /// query path treat any error here as a cache miss.
    pub async fn get_table(&self, key: &str) -> Result<Option<Vec<Record>>, Error> {
        let key = key.to_string();
        let now = Utc::now().to_rfc3339();
        let payload = self
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT payload FROM table_cache WHERE key = ?1 AND expires_at > ?2")?;

                let result = stmt.query_row(params![key, now], |row| row.get(0));

                match result {
                    Ok(payload) => Ok(Some(payload)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        match payload {
            Some(json) => {
                let records = serde_json::from_str(&json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
                Ok(Some(records))
            }
            None => Ok(None),
        }
    }

    /// Store a snapshot, overwriting any prior entry under the key.
    ///
    /// Uses UPSERT semantics with an expiry `ttl_seconds` in the future.
    /// The JSON payload round-trips records exactly, including nested
    /// values and null.
    pub async fn put_table(&self, key: &str, records: &[Record], ttl_seconds: i64) -> Result<(), Error> {
        let key = key.to_string();
        let payload = serde_json::to_string(records).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let record_count = records.len() as i64;

        let fetched_at = Utc::now().to_rfc3339();
        let expires_at = (Utc::now() + Duration::seconds(ttl_seconds)).to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO table_cache (key, payload, record_count, fetched_at, expires_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(key) DO UPDATE SET
                        payload = excluded.payload,
                        record_count = excluded.record_count,
                        fetched_at = excluded.fetched_at,
                        expires_at = excluded.expires_at",
                    params![key, payload, record_count, fetched_at, expires_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Seconds until an entry expires.
    ///
    /// Returns None for a missing or already-expired key. Diagnostics
    /// only; the query path never consults this.
    pub async fn ttl_remaining(&self, key: &str) -> Result<Option<i64>, Error> {
        let key = key.to_string();
        let expires_at = self
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT expires_at FROM table_cache WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                );

                match result {
                    Ok(expires_at) => Ok(Some(expires_at)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        Ok(expires_at.and_then(|raw| {
            let expiry = DateTime::parse_from_rfc3339(&raw).ok()?;
            let remaining = (expiry.with_timezone(&Utc) - Utc::now()).num_seconds();
            (remaining > 0).then_some(remaining)
        }))
    }

    /// List fresh entries whose key matches a SQL LIKE pattern.
    ///
    /// Diagnostics only: reports per-entry record count, expiry, and
    /// serialized payload size without deserializing payloads.
    pub async fn list_entries(&self, pattern: &str) -> Result<Vec<CacheEntryMeta>, Error> {
        let pattern = pattern.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<Vec<CacheEntryMeta>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, record_count, expires_at, length(payload)
                    FROM table_cache
                    WHERE key LIKE ?1 AND expires_at > ?2
                    ORDER BY key",
                )?;

                let rows = stmt.query_map(params![pattern, now], |row| {
                    Ok(CacheEntryMeta {
                        key: row.get(0)?,
                        record_count: row.get(1)?,
                        expires_at: row.get(2)?,
                        size_bytes: row.get(3)?,
                    })
                })?;

                let mut entries = Vec::new();
                for row in rows {
                    entries.push(row?);
                }
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }
}

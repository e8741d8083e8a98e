//! SQLite-backed cache for whole-table snapshots.
//!
//! This module provides a persistent snapshot cache using SQLite with
//! async access via tokio-rusqlite. It supports:
//!
//! - Flat key-addressed entries holding serialized table snapshots
//! - Per-entry TTL with lazy expiration (no eviction sweep)
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - A diagnostics listing over the key namespace

pub mod connection;
pub mod key;
pub mod migrations;
pub mod snapshots;

pub use crate::Error;

pub use connection::CacheDb;
pub use key::{row_key, table_key};
pub use snapshots::CacheEntryMeta;

/// TTL for whole-table snapshots, in seconds.
pub const TABLE_TTL_SECS: i64 = 600;

/// TTL for row-scoped point lookups, in seconds.
///
/// Shorter than the table TTL because these entries are served straight
/// back as point lookups rather than filtered in memory.
pub const ROW_TTL_SECS: i64 = 120;

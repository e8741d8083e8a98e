//! Cache-related MCP tools.
//!
//! This module provides the diagnostics surface over the snapshot cache.

pub mod stats;

pub use stats::{CacheStatsParams, stats_impl};

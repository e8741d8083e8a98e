//! MCP tool implementations.
//!
//! This module contains all tools exposed by the mcp-table server.

pub mod activity_prompt;
pub mod cache;
pub mod table_query;

pub use activity_prompt::{ActivityPromptParams, prompt_impl};
pub use cache::{CacheStatsParams, stats_impl};
pub use table_query::{TableQueryParams, query_impl};

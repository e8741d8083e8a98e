//! Client code for mcp-table.
//!
//! This crate provides the source connector: a client for the remote
//! PostgREST-style data source, plus the trait seam the query
//! orchestrator is written against.

pub mod source;

pub use source::{SourceClient, SourceConfig, SourceError, TableSource};

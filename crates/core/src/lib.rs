//! Core types and shared functionality for mcp-table.
//!
//! This crate provides:
//! - Record and filter types with the predicate evaluator
//! - Snapshot cache implementation with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod record;

pub use cache::CacheDb;
pub use config::AppConfig;
pub use error::Error;
pub use filter::{Condition, Filter, evaluate};
pub use record::Record;

//! Remote data source client.
//!
//! Provides a client for a PostgREST-style REST API (one route per
//! table) with request validation and response normalization.
//!
//! ### Protocol
//!
//! - **Endpoint**: `GET {base}/rest/v1/{table}?select={columns}`
//! - **Authentication**: `apikey` header plus bearer token.
//! - **Schema scoping**: `Accept-Profile` header names the schema.
//! - **Results**: the full table as a JSON array, or an error. No
//!   partial results, no internal retries — the caller decides whether
//!   to degrade.
//! - An unknown table or schema answers 404, which maps to an empty
//!   table rather than a failure; the orchestrator's fallback path owns
//!   that case.

pub mod error;

pub use error::SourceError;

use async_trait::async_trait;
use reqwest::header;
use std::time::{Duration, Instant};
use url::Url;

use tablecache_core::Record;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "mcp-table/0.1";

/// Data source client configuration.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Base URL of the data source, without the `/rest/v1` suffix.
    pub base_url: String,
    /// API key; sent as `apikey` and as a bearer token when set.
    pub api_key: Option<String>,
    /// Request timeout (default: 20s).
    pub timeout: Duration,
    /// User-agent string (default: mcp-table/0.x).
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SourceConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads MCP_TABLE_SOURCE_URL (required) and MCP_TABLE_SOURCE_API_KEY.
    pub fn from_env() -> Result<Self, SourceError> {
        let base_url = std::env::var("MCP_TABLE_SOURCE_URL").map_err(|_| SourceError::MissingBaseUrl)?;
        let api_key = std::env::var("MCP_TABLE_SOURCE_API_KEY").ok();

        Ok(Self { base_url, api_key, ..Default::default() })
    }
}

/// A provider of whole-table fetches.
///
/// The trait seam lets the query orchestrator run against a stub source
/// in tests without changing orchestration code.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Fetch the entire contents of one table.
    ///
    /// Either the full table is produced or the call fails; no partial
    /// results. `columns` is a comma-separated projection, `*` for all.
    async fn fetch_table(&self, schema: &str, table: &str, columns: &str) -> Result<Vec<Record>, SourceError>;
}

/// Data source client over a PostgREST-style REST API.
#[derive(Debug, Clone)]
pub struct SourceClient {
    http: reqwest::Client,
    base_url: Url,
    config: SourceConfig,
}

impl SourceClient {
    /// Create a new source client with the given configuration.
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        if config.base_url.is_empty() {
            return Err(SourceError::MissingBaseUrl);
        }

        let base_url =
            Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| SourceError::InvalidBaseUrl(e.to_string()))?;

        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .build()
            .map_err(|e| SourceError::Network(std::sync::Arc::new(e)))?;

        Ok(Self { http, base_url, config })
    }

    /// Create a new source client from environment variables.
    pub fn from_env() -> Result<Self, SourceError> {
        Self::new(SourceConfig::from_env()?)
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

#[async_trait]
impl TableSource for SourceClient {
    async fn fetch_table(&self, schema: &str, table: &str, columns: &str) -> Result<Vec<Record>, SourceError> {
        let start = Instant::now();
        let url = format!("{}/rest/v1/{}", self.base_url.as_str().trim_end_matches('/'), table);
        let select = if columns.is_empty() { "*" } else { columns };

        tracing::debug!("fetching table {}.{} (select={})", schema, table, select);

        let mut request = self
            .http
            .get(&url)
            .query(&[("select", select)])
            .header("Accept-Profile", schema)
            .header(header::ACCEPT, "application/json");

        if let Some(api_key) = &self.config.api_key {
            request = request
                .header("apikey", api_key)
                .bearer_auth(api_key);
        }

        let response = request.send().await.map_err(SourceError::from)?;

        let status = response.status();
        tracing::debug!("source response status: {}", status);

        if status == 401 || status == 403 {
            return Err(SourceError::AuthError);
        }

        // PostgREST answers 404 for an unknown relation; the design treats
        // an invalid schema/table name as an empty table, not a failure.
        if status == 404 {
            return Ok(Vec::new());
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(SourceError::HttpError { status: status.as_u16() });
        }

        let bytes = response.bytes().await.map_err(SourceError::from)?;
        let records: Vec<Record> = serde_json::from_slice(&bytes).map_err(|e| SourceError::Parse(e.to_string()))?;

        tracing::debug!(
            "fetched {}.{} in {:?}, {} records",
            schema,
            table,
            start.elapsed(),
            records.len()
        );

        Ok(records)
    }
}

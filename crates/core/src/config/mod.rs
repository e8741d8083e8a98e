//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (MCP_TABLE_*)
//! 2. TOML config file (if MCP_TABLE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (MCP_TABLE_*)
/// 2. TOML config file (if MCP_TABLE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the remote data source (PostgREST-style API).
    ///
    /// Set via MCP_TABLE_SOURCE_URL environment variable.
    /// Required at startup; the server cannot resolve queries without it.
    #[serde(default)]
    pub source_url: Option<String>,

    /// API key sent as `apikey` and bearer token to the data source.
    ///
    /// Set via MCP_TABLE_SOURCE_API_KEY environment variable.
    #[serde(default)]
    pub source_api_key: Option<String>,

    /// Path to SQLite cache database.
    ///
    /// Set via MCP_TABLE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via MCP_TABLE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via MCP_TABLE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Schema used when a query names no schema.
    ///
    /// Set via MCP_TABLE_DEFAULT_SCHEMA environment variable.
    #[serde(default = "default_schema")]
    pub default_schema: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./mcp-table-cache.sqlite")
}

fn default_user_agent() -> String {
    "mcp-table/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_schema() -> String {
    "prompt_info".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_url: None,
            source_api_key: None,
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            default_schema: default_schema(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `MCP_TABLE_`
    /// 2. TOML file from `MCP_TABLE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("MCP_TABLE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("MCP_TABLE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check that the source base URL is configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the source URL is not set.
    pub fn require_source_url(&self) -> Result<&str, ConfigError> {
        self.source_url.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "source_url".into(),
            hint: "Set MCP_TABLE_SOURCE_URL environment variable".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./mcp-table-cache.sqlite"));
        assert_eq!(config.user_agent, "mcp-table/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.default_schema, "prompt_info");
        assert!(config.source_url.is_none());
        assert!(config.source_api_key.is_none());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_require_source_url_missing() {
        let config = AppConfig::default();
        let result = config.require_source_url();
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_source_url_present() {
        let config = AppConfig { source_url: Some("https://db.example.com".into()), ..Default::default() };
        let result = config.require_source_url();
        assert_eq!(result.unwrap(), "https://db.example.com");
    }
}

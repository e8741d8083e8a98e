//! Source connector error types.

use std::sync::Arc;

/// Errors from the remote data source client.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// No base URL configured for the data source.
    #[error("missing source URL: MCP_TABLE_SOURCE_URL not set")]
    MissingBaseUrl,

    /// Configured base URL failed to parse.
    #[error("invalid source URL: {0}")]
    InvalidBaseUrl(String),

    /// Authentication failed (invalid API key).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { SourceError::Timeout } else { SourceError::Network(Arc::new(err)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SourceError::MissingBaseUrl;
        assert!(err.to_string().contains("source URL"));

        let err = SourceError::HttpError { status: 500 };
        assert!(err.to_string().contains("500"));
    }
}

// Runtime Configuration
//
// Explicit config values built by the binaries from CLI flags and passed to
// constructors. Nothing in the crate reads configuration from globals.

use std::time::Duration;

/// Settings for the ingestion worker.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// CometBFT RPC base URL, e.g. `http://localhost:26657`.
    pub rpc_url: String,
    /// Path to the SQLite database file.
    pub db_path: String,
    /// Sleep between tip probes while tailing.
    pub poll_interval: Duration,
    /// First height to index, overriding the stored checkpoint.
    pub start_height: Option<i64>,
    /// Per-request RPC timeout.
    pub request_timeout: Duration,
}

/// Settings for the read API server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Path to the SQLite database produced by the indexer.
    pub db_path: String,
    /// `host:port` to listen on.
    pub listen: String,
    pub cors: CorsConfig,
}

/// Browser CORS origin allowlist. Empty means CORS is disabled entirely.
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    origins: Vec<String>,
}

impl CorsConfig {
    /// Parse a comma-separated allowlist; blanks are dropped.
    pub fn from_list(raw: &str) -> Self {
        let origins = raw
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        Self { origins }
    }

    pub fn is_enabled(&self) -> bool {
        !self.origins.is_empty()
    }

    /// Resolve the `Access-Control-Allow-Origin` value for a request origin:
    /// `*` when the wildcard is allowlisted, the origin itself when listed,
    /// `None` otherwise (no CORS headers at all).
    pub fn allow_origin(&self, origin: &str) -> Option<&str> {
        let origin = origin.trim();
        if origin.is_empty() || self.origins.is_empty() {
            return None;
        }
        if self.origins.iter().any(|o| o == "*") {
            return Some("*");
        }
        self.origins.iter().find(|o| o.as_str() == origin).map(String::as_str)
    }
}

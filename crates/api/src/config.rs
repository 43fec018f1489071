//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use ingest::FailurePolicy;
use ingest::policy::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `8081`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — PostgreSQL URL; unset or empty selects the in-memory store
/// - `DATABASE_MAX_CONNECTIONS` — pool size (default: `25`)
/// - `INGEST_QUEUE_CAPACITY` — undelivered messages held by the queue (default: `1024`)
/// - `INGEST_READ_TIMEOUT_MS` — consumer wait per read (default: `1000`)
/// - `INGEST_FAILURE_POLICY` — `drop`, `retry` or `dead-letter` (default: `drop`)
/// - `INGEST_MAX_RETRIES` — extra attempts under `retry` (default: `3`)
/// - `INGEST_RETRY_BACKOFF_MS` — pause between attempts under `retry` (default: `500`)
///
/// Unparseable values fall back to their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub ingest_queue_capacity: usize,
    pub ingest_read_timeout: Duration,
    pub failure_policy: FailurePolicy,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let failure_policy = match lookup("INGEST_FAILURE_POLICY")
            .and_then(|v| v.parse::<FailurePolicy>().ok())
            .unwrap_or_default()
        {
            FailurePolicy::Retry { .. } => FailurePolicy::Retry {
                max_retries: parse_var(&lookup, "INGEST_MAX_RETRIES").unwrap_or(DEFAULT_MAX_RETRIES),
                backoff: parse_var(&lookup, "INGEST_RETRY_BACKOFF_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_RETRY_BACKOFF),
            },
            other => other,
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            ingest_queue_capacity: parse_var(&lookup, "INGEST_QUEUE_CAPACITY")
                .unwrap_or(defaults.ingest_queue_capacity),
            ingest_read_timeout: parse_var(&lookup, "INGEST_READ_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.ingest_read_timeout),
            failure_policy,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            log_level: "info".to_string(),
            database_url: None,
            database_max_connections: 25,
            ingest_queue_capacity: 1024,
            ingest_read_timeout: Duration::from_secs(1),
            failure_policy: FailurePolicy::Drop,
        }
    }
}

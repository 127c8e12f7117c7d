//! Server configuration module.
//!
//! Loads every runtime option from `EDGEWATCH_*` environment variables once at
//! startup. Components receive their settings from the resulting [`Config`].

use anyhow::{bail, Context, Result};
use shared::config::RetentionPolicy;
use shared::detect::DEFAULT_THRESHOLD;
use shared::storage::{TableNames, DEFAULT_WRITE_CONCURRENCY};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Default request body limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// API key accepted when none is configured.
pub const DEFAULT_API_KEY: &str = "dev-test-key-123";

/// Which durable store backs the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Process-local map; lost on restart.
    #[default]
    Memory,
    /// `ClickHouse` tables.
    ClickHouse,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "clickhouse" => Ok(Self::ClickHouse),
            other => bail!("Unknown store backend '{other}' (expected 'memory' or 'clickhouse')"),
        }
    }
}

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `EDGEWATCH_HOST` / `EDGEWATCH_PORT`: bind address (default `0.0.0.0:8080`)
/// - `EDGEWATCH_API_KEY`: shared secret expected in `x-api-key`
/// - `EDGEWATCH_STORE`: `memory` or `clickhouse`
/// - `EDGEWATCH_METRICS_TABLE`, `EDGEWATCH_LOGS_TABLE`, `EDGEWATCH_TRACES_TABLE`
/// - `EDGEWATCH_ALERT_CONFIGS_TABLE`, `EDGEWATCH_ALERT_TARGETS`
/// - `EDGEWATCH_TELEGRAM_BOT_TOKEN`, `EDGEWATCH_TELEGRAM_API_URL`
/// - `EDGEWATCH_ALERT_TIMEOUT_SECS`, `EDGEWATCH_ANOMALY_THRESHOLD`
/// - `EDGEWATCH_RETENTION_DAYS`, `EDGEWATCH_WRITE_CHUNK_SIZE`
/// - `EDGEWATCH_WRITE_CONCURRENCY`, `EDGEWATCH_MAX_BODY_BYTES`
///
/// Database connection settings live in [`crate::db::DatabaseConfig`].
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Shared secret callers must present.
    pub api_key: String,
    /// Durable store backend.
    pub store: StoreBackend,
    /// Item tables, one per record kind.
    pub tables: TableNames,
    /// Tenant → chat lookup table.
    pub alert_configs_table: String,
    /// Static `tenant=chat_id,...` overrides.
    pub alert_targets: String,
    /// Messaging credential; `None` means log-only alerts.
    pub telegram_bot_token: Option<String>,
    /// Messaging API base URL.
    pub telegram_api_url: String,
    /// Bound on one alert lookup and delivery.
    pub alert_timeout: Duration,
    /// Modified z-score threshold.
    pub anomaly_threshold: f64,
    /// Item retention.
    pub retention: RetentionPolicy,
    /// Records per storage batch-put; `None` uses the store's own limit.
    pub write_chunk_size: Option<usize>,
    /// Storage chunks in flight at once.
    pub write_concurrency: usize,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(name)
        .map(|v| v.trim().parse::<T>())
        .transpose()
        .with_context(|| format!("Invalid value for {name}"))
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - a numeric variable is set but cannot be parsed
    /// - `EDGEWATCH_STORE` names an unknown backend
    /// - the retention period is outside `1..=3650` days
    /// - the anomaly threshold is not a positive finite number
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let tables = TableNames {
            metrics: var("EDGEWATCH_METRICS_TABLE").unwrap_or(defaults.tables.metrics),
            logs: var("EDGEWATCH_LOGS_TABLE").unwrap_or(defaults.tables.logs),
            traces: var("EDGEWATCH_TRACES_TABLE").unwrap_or(defaults.tables.traces),
        };

        let config = Self {
            host: var("EDGEWATCH_HOST").unwrap_or(defaults.host),
            port: parsed("EDGEWATCH_PORT")?.unwrap_or(defaults.port),
            api_key: var("EDGEWATCH_API_KEY").unwrap_or(defaults.api_key),
            store: var("EDGEWATCH_STORE")
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(defaults.store),
            tables,
            alert_configs_table: var("EDGEWATCH_ALERT_CONFIGS_TABLE")
                .unwrap_or(defaults.alert_configs_table),
            alert_targets: var("EDGEWATCH_ALERT_TARGETS").unwrap_or_default(),
            telegram_bot_token: var("EDGEWATCH_TELEGRAM_BOT_TOKEN"),
            telegram_api_url: var("EDGEWATCH_TELEGRAM_API_URL")
                .unwrap_or(defaults.telegram_api_url),
            alert_timeout: parsed::<u64>("EDGEWATCH_ALERT_TIMEOUT_SECS")?
                .map_or(defaults.alert_timeout, Duration::from_secs),
            anomaly_threshold: parsed("EDGEWATCH_ANOMALY_THRESHOLD")?
                .unwrap_or(defaults.anomaly_threshold),
            retention: parsed::<u32>("EDGEWATCH_RETENTION_DAYS")?
                .map_or(defaults.retention, RetentionPolicy::new),
            write_chunk_size: parsed("EDGEWATCH_WRITE_CHUNK_SIZE")?,
            write_concurrency: parsed("EDGEWATCH_WRITE_CONCURRENCY")?
                .unwrap_or(defaults.write_concurrency),
            max_body_bytes: parsed("EDGEWATCH_MAX_BODY_BYTES")?
                .unwrap_or(defaults.max_body_bytes),
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.retention
            .validate()
            .context("Invalid EDGEWATCH_RETENTION_DAYS")?;
        if !self.anomaly_threshold.is_finite() || self.anomaly_threshold <= 0.0 {
            bail!(
                "EDGEWATCH_ANOMALY_THRESHOLD must be a positive number, got {}",
                self.anomaly_threshold
            );
        }
        if self.write_chunk_size == Some(0) {
            bail!("EDGEWATCH_WRITE_CHUNK_SIZE must be at least 1");
        }
        if self.write_concurrency == 0 {
            bail!("EDGEWATCH_WRITE_CONCURRENCY must be at least 1");
        }
        if self.max_body_bytes == 0 {
            bail!("EDGEWATCH_MAX_BODY_BYTES must be at least 1");
        }
        Ok(())
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port do not form a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_key: DEFAULT_API_KEY.to_string(),
            store: StoreBackend::Memory,
            tables: TableNames::default(),
            alert_configs_table: "edgewatch_alert_configs".to_string(),
            alert_targets: String::new(),
            telegram_bot_token: None,
            telegram_api_url: shared::alert::DEFAULT_TELEGRAM_API_URL.to_string(),
            alert_timeout: shared::alert::DEFAULT_ALERT_TIMEOUT,
            anomaly_threshold: DEFAULT_THRESHOLD,
            retention: RetentionPolicy::default(),
            write_chunk_size: None,
            write_concurrency: DEFAULT_WRITE_CONCURRENCY,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use crate::config::{Config, StoreBackend};
use crate::db::{Database, DatabaseConfig};
use crate::pipeline::IngestPipeline;
use anyhow::{Context, Result};
use shared::alert::{AlertDispatcher, ChainedTargets, StaticTargets, TelegramNotifier};
use shared::detect::AnomalyDetector;
use shared::storage::{InMemoryStore, StorageWriter, TelemetryStore};
use std::sync::Arc;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<IngestPipeline>,
}

impl AppState {
    /// Creates a new application state around a pipeline.
    #[must_use]
    pub fn new(pipeline: IngestPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Wires a pipeline from configuration and explicit collaborators.
    #[must_use]
    pub fn from_parts(
        config: &Config,
        store: Arc<dyn TelemetryStore>,
        dispatcher: AlertDispatcher,
    ) -> Self {
        let mut writer = StorageWriter::new(store)
            .with_retention(config.retention)
            .with_concurrency(config.write_concurrency);
        if let Some(chunk_size) = config.write_chunk_size {
            writer = writer.with_chunk_size(chunk_size);
        }
        let detector = AnomalyDetector::new(config.anomaly_threshold);
        Self::new(IngestPipeline::new(
            config.api_key.clone(),
            writer,
            detector,
            dispatcher,
        ))
    }

    /// Creates a state with an in-memory store and log-only alerts.
    ///
    /// This is useful for development and testing.
    #[must_use]
    pub fn with_in_memory_store() -> Self {
        let config = Config::default();
        Self::from_parts(
            &config,
            InMemoryStore::new_shared(),
            AlertDispatcher::new(Arc::new(StaticTargets::new())),
        )
    }

    /// Builds the full state described by `config`.
    ///
    /// With the `ClickHouse` backend this connects, creates the tables and
    /// resolves alert targets from static overrides first, then the alert
    /// configuration table.
    ///
    /// # Errors
    ///
    /// Returns an error if the alert target mapping is invalid, the
    /// messaging client cannot be built or the database setup fails.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let static_targets = Arc::new(
            StaticTargets::parse(&config.alert_targets)
                .context("Invalid EDGEWATCH_ALERT_TARGETS")?,
        );

        let (store, resolver): (Arc<dyn TelemetryStore>, ChainedTargets) = match config.store {
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                let store: Arc<dyn TelemetryStore> = InMemoryStore::new_shared();
                (store, ChainedTargets::new().with(static_targets))
            }
            StoreBackend::ClickHouse => {
                let db_config = DatabaseConfig::from_env();
                let db = Database::new(&db_config);
                db.ping().await?;
                tracing::info!(
                    url = %db_config.url,
                    database = %db_config.database,
                    "Connected to ClickHouse"
                );

                let store: Arc<dyn TelemetryStore> =
                    Arc::new(db.item_store(config.tables.clone()).await?);
                let targets = db.alert_targets(&config.alert_configs_table).await?;
                (
                    store,
                    ChainedTargets::new()
                        .with(static_targets)
                        .with(Arc::new(targets)),
                )
            }
        };

        let mut dispatcher =
            AlertDispatcher::new(Arc::new(resolver)).with_timeout(config.alert_timeout);
        match &config.telegram_bot_token {
            Some(token) => {
                let notifier = TelegramNotifier::new(token.clone(), config.alert_timeout)
                    .context("Failed to build Telegram client")?
                    .with_api_url(config.telegram_api_url.clone());
                dispatcher = dispatcher.with_notifier(Arc::new(notifier));
            }
            None => {
                tracing::warn!("EDGEWATCH_TELEGRAM_BOT_TOKEN not set; anomalies will only be logged");
            }
        }

        Ok(Self::from_parts(config, store, dispatcher))
    }

    /// Returns the ingestion pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &IngestPipeline {
        &self.pipeline
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_in_memory_store()
    }
}

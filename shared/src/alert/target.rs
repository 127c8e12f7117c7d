//! Resolution of a tenant's alert delivery target.

use super::AlertError;
use crate::storage::clickhouse::is_valid_table_name;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Looks up where a tenant's alerts go.
#[async_trait]
pub trait TargetResolver: Send + Sync {
    /// Returns the chat id for `tenant`, or `None` when none is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails.
    async fn resolve(&self, tenant: &str) -> Result<Option<String>, AlertError>;
}

/// Fixed tenant → chat mapping.
///
/// # Example
///
/// ```
/// use shared::alert::StaticTargets;
///
/// let targets = StaticTargets::parse("edge-1=-100123, edge-2=42").unwrap();
/// assert_eq!(targets.get("edge-2"), Some("42"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticTargets {
    targets: HashMap<String, String>,
}

impl StaticTargets {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mapping.
    #[must_use]
    pub fn with_target(mut self, tenant: impl Into<String>, chat_id: impl Into<String>) -> Self {
        self.targets.insert(tenant.into(), chat_id.into());
        self
    }

    /// Parses `tenant=chat_id` pairs separated by commas. Blank input is an
    /// empty mapping.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::InvalidTargets`] for a pair without `=` or with
    /// an empty side.
    pub fn parse(raw: &str) -> Result<Self, AlertError> {
        let mut targets = HashMap::new();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (tenant, chat) = pair
                .split_once('=')
                .map(|(t, c)| (t.trim(), c.trim()))
                .filter(|(t, c)| !t.is_empty() && !c.is_empty())
                .ok_or_else(|| AlertError::InvalidTargets(pair.to_string()))?;
            targets.insert(tenant.to_string(), chat.to_string());
        }
        Ok(Self { targets })
    }

    /// Chat id for a tenant.
    #[must_use]
    pub fn get(&self, tenant: &str) -> Option<&str> {
        self.targets.get(tenant).map(String::as_str)
    }

    /// Number of configured tenants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no tenant is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[async_trait]
impl TargetResolver for StaticTargets {
    async fn resolve(&self, tenant: &str) -> Result<Option<String>, AlertError> {
        Ok(self.get(tenant).map(str::to_string))
    }
}

#[derive(Debug, clickhouse::Row, Deserialize)]
struct TargetRow {
    telegram_chat_id: String,
}

/// Looks up `telegram_chat_id` by `cluster_id` in a `ClickHouse` table.
#[derive(Clone)]
pub struct ClickHouseTargets {
    client: Arc<clickhouse::Client>,
    table: String,
}

impl ClickHouseTargets {
    /// Creates a resolver over the alert configuration table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table name is not a plain identifier.
    pub fn new(client: Arc<clickhouse::Client>, table: impl Into<String>) -> Result<Self, AlertError> {
        let table = table.into();
        if !is_valid_table_name(&table) {
            return Err(AlertError::Lookup(format!("Invalid table name '{table}'")));
        }
        Ok(Self { client, table })
    }

    /// Creates the alert configuration table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), AlertError> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
                cluster_id String, \
                telegram_chat_id String, \
                updated_at DateTime DEFAULT now()\
            ) ENGINE = ReplacingMergeTree(updated_at) ORDER BY cluster_id",
            self.table
        );
        self.client
            .query(&ddl)
            .execute()
            .await
            .map_err(|e| AlertError::Lookup(e.to_string()))
    }
}

#[async_trait]
impl TargetResolver for ClickHouseTargets {
    async fn resolve(&self, tenant: &str) -> Result<Option<String>, AlertError> {
        let sql = format!(
            "SELECT telegram_chat_id FROM {} FINAL WHERE cluster_id = ? LIMIT 1",
            self.table
        );
        let row = self
            .client
            .query(&sql)
            .bind(tenant)
            .fetch_optional::<TargetRow>()
            .await
            .map_err(|e| AlertError::Lookup(e.to_string()))?;
        Ok(row
            .map(|r| r.telegram_chat_id)
            .filter(|chat| !chat.is_empty()))
    }
}

/// Tries resolvers in order; the first configured target wins.
///
/// A failing resolver is logged and the next one is tried.
#[derive(Clone, Default)]
pub struct ChainedTargets {
    resolvers: Vec<Arc<dyn TargetResolver>>,
}

impl ChainedTargets {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a resolver.
    #[must_use]
    pub fn with(mut self, resolver: Arc<dyn TargetResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }
}

#[async_trait]
impl TargetResolver for ChainedTargets {
    async fn resolve(&self, tenant: &str) -> Result<Option<String>, AlertError> {
        let mut last_error = None;
        for resolver in &self.resolvers {
            match resolver.resolve(tenant).await {
                Ok(Some(target)) => return Ok(Some(target)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(tenant, error = %e, "Alert target lookup failed");
                    last_error = Some(e);
                }
            }
        }
        last_error.map_or(Ok(None), Err)
    }
}

//! `ClickHouse`-backed store.
//!
//! One table per item kind, each a `ReplacingMergeTree` ordered by
//! `(partition_key, sort_key)` so a re-delivered item collapses into the
//! original. Reads use `FINAL` to see the collapsed state before a merge.
//! The table TTL reclaims items once `expires_at` passes.

use super::{ItemBody, ItemKind, StoreError, StoredItem, TelemetryStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default rows per insert. Each insert becomes one part, so inserts are
/// kept large.
pub const DEFAULT_CLICKHOUSE_BATCH_SIZE: usize = 10_000;

/// Table names, one per item kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    /// Metric samples table.
    pub metrics: String,
    /// Log records table.
    pub logs: String,
    /// Spans table.
    pub traces: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            metrics: "edgewatch_metrics".to_string(),
            logs: "edgewatch_logs".to_string(),
            traces: "edgewatch_traces".to_string(),
        }
    }
}

impl TableNames {
    /// Table holding items of `kind`.
    #[must_use]
    pub fn for_kind(&self, kind: ItemKind) -> &str {
        match kind {
            ItemKind::Metric => &self.metrics,
            ItemKind::Log => &self.logs,
            ItemKind::Span => &self.traces,
        }
    }

    fn validate(&self) -> Result<(), StoreError> {
        for name in [&self.metrics, &self.logs, &self.traces] {
            if !is_valid_table_name(name) {
                return Err(StoreError::StorageError(format!(
                    "Invalid table name '{name}'"
                )));
            }
        }
        Ok(())
    }
}

/// Table names are interpolated into SQL, so only `[A-Za-z0-9_.]` is allowed.
pub(crate) fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Retry policy applied to each store call.
///
/// The delay doubles after every failed attempt, capped at `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound on the delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds or attempts are exhausted.
    ///
    /// # Errors
    ///
    /// Returns the last error once every attempt has failed.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        operation = what,
                        attempt,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Store call failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                    attempt += 1;
                }
            }
        }
    }
}

#[derive(Debug, Clone, ::clickhouse::Row, Serialize, Deserialize)]
struct ItemRow {
    partition_key: String,
    sort_key: String,
    timestamp: f64,
    payload: String,
    expires_at: u32,
}

impl ItemRow {
    fn from_item(item: &StoredItem) -> Result<Self, StoreError> {
        Ok(Self {
            partition_key: item.partition_key.clone(),
            sort_key: item.sort_key.clone(),
            timestamp: item.timestamp_secs(),
            payload: serde_json::to_string(&item.body)?,
            expires_at: u32::try_from(item.ttl.max(0)).unwrap_or(u32::MAX),
        })
    }

    fn into_item(self) -> Result<StoredItem, StoreError> {
        let body: ItemBody = serde_json::from_str(&self.payload)?;
        Ok(StoredItem {
            partition_key: self.partition_key,
            sort_key: self.sort_key,
            ttl: i64::from(self.expires_at),
            body,
        })
    }
}

const COLUMNS: &str = "partition_key, sort_key, timestamp, payload, expires_at";

/// `ClickHouse` store implementation.
#[derive(Clone)]
pub struct ClickHouseStore {
    client: Arc<::clickhouse::Client>,
    tables: TableNames,
    retry: RetryPolicy,
    max_batch_size: usize,
}

impl ClickHouseStore {
    /// Creates a store over the given client and tables.
    ///
    /// # Errors
    ///
    /// Returns an error if a table name is not a plain identifier.
    pub fn new(client: Arc<::clickhouse::Client>, tables: TableNames) -> Result<Self, StoreError> {
        tables.validate()?;
        Ok(Self {
            client,
            tables,
            retry: RetryPolicy::default(),
            max_batch_size: DEFAULT_CLICKHOUSE_BATCH_SIZE,
        })
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides the per-call batch limit.
    #[must_use]
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    /// DDL for one item table.
    #[must_use]
    pub fn table_ddl(table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
                partition_key String, \
                sort_key String, \
                timestamp Float64, \
                payload String, \
                expires_at UInt32\
            ) ENGINE = ReplacingMergeTree \
            ORDER BY (partition_key, sort_key) \
            TTL toDateTime(expires_at)"
        )
    }

    /// Creates the item tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for kind in [ItemKind::Metric, ItemKind::Log, ItemKind::Span] {
            let ddl = Self::table_ddl(self.tables.for_kind(kind));
            self.client.query(&ddl).execute().await?;
            tracing::debug!(table = self.tables.for_kind(kind), "Ensured item table");
        }
        Ok(())
    }

    async fn insert_rows(&self, table: &str, rows: &[ItemRow]) -> Result<(), StoreError> {
        let mut insert = self.client.insert::<ItemRow>(table).await?;
        for row in rows {
            insert.write(row).await?;
        }
        insert.end().await?;
        Ok(())
    }
}

#[async_trait]
impl TelemetryStore for ClickHouseStore {
    async fn batch_put(&self, items: &[StoredItem]) -> Result<(), StoreError> {
        if items.is_empty() {
            return Ok(());
        }

        for kind in [ItemKind::Metric, ItemKind::Log, ItemKind::Span] {
            let rows = items
                .iter()
                .filter(|item| item.kind() == kind)
                .map(ItemRow::from_item)
                .collect::<Result<Vec<_>, _>>()?;
            if rows.is_empty() {
                continue;
            }

            let table = self.tables.for_kind(kind);
            self.retry
                .run("batch_put", || self.insert_rows(table, &rows))
                .await?;
        }
        Ok(())
    }

    async fn get(
        &self,
        kind: ItemKind,
        partition_key: &str,
        sort_key: &str,
    ) -> Result<Option<StoredItem>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM {} FINAL \
             WHERE partition_key = ? AND sort_key = ? AND expires_at > toUnixTimestamp(now()) \
             LIMIT 1",
            self.tables.for_kind(kind)
        );

        let row = self
            .retry
            .run("get", || async {
                Ok(self
                    .client
                    .query(&sql)
                    .bind(partition_key)
                    .bind(sort_key)
                    .fetch_optional::<ItemRow>()
                    .await?)
            })
            .await?;

        row.map(ItemRow::into_item).transpose()
    }

    async fn query_partition(
        &self,
        kind: ItemKind,
        partition_key: &str,
        limit: usize,
    ) -> Result<Vec<StoredItem>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM {} FINAL \
             WHERE partition_key = ? AND expires_at > toUnixTimestamp(now()) \
             ORDER BY timestamp DESC, sort_key ASC LIMIT {limit}",
            self.tables.for_kind(kind)
        );

        let rows = self
            .retry
            .run("query_partition", || async {
                Ok(self
                    .client
                    .query(&sql)
                    .bind(partition_key)
                    .fetch_all::<ItemRow>()
                    .await?)
            })
            .await?;

        rows.into_iter().map(ItemRow::into_item).collect()
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}

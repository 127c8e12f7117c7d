//! In-memory store for development and tests.

use super::{ItemKind, StoreError, StoredItem, TelemetryStore, DEFAULT_MAX_BATCH_SIZE};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

type Key = (ItemKind, String, String);

/// In-memory store implementation.
///
/// Items are kept in a map keyed by `(kind, partition, sort)` behind a
/// `RwLock`, so a repeated key overwrites. Expired items stay in memory but
/// are hidden from reads.
///
/// **Note:** Data is not persisted across restarts.
///
/// # Example
///
/// ```
/// use shared::models::MetricSample;
/// use shared::storage::{InMemoryStore, ItemKind, StoredItem, TelemetryStore};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStore::new();
/// let item = StoredItem::from_sample(&MetricSample::new("up", 1.0, 1.0), i64::MAX);
/// store.batch_put(&[item.clone()]).await.unwrap();
///
/// let found = store.get(ItemKind::Metric, "unknown", &item.sort_key).await.unwrap();
/// assert_eq!(found, Some(item));
/// # });
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    items: RwLock<HashMap<Key, StoredItem>>,
    batch_put_calls: AtomicUsize,
    max_batch_size: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            batch_put_calls: AtomicUsize::new(0),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Creates a new store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Overrides the per-call batch limit.
    #[must_use]
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    /// Number of `batch_put` calls received so far.
    #[must_use]
    pub fn batch_put_calls(&self) -> usize {
        self.batch_put_calls.load(Ordering::SeqCst)
    }

    /// Number of items held, expired ones included.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        let items = self.items.read().map_err(|_| StoreError::LockError)?;
        Ok(items.len())
    }

    /// Whether the store holds no items.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl TelemetryStore for InMemoryStore {
    async fn batch_put(&self, items: &[StoredItem]) -> Result<(), StoreError> {
        self.batch_put_calls.fetch_add(1, Ordering::SeqCst);
        if items.len() > self.max_batch_size {
            return Err(StoreError::StorageError(format!(
                "batch of {} exceeds limit of {}",
                items.len(),
                self.max_batch_size
            )));
        }

        let mut stored = self.items.write().map_err(|_| StoreError::LockError)?;
        for item in items {
            stored.insert(
                (item.kind(), item.partition_key.clone(), item.sort_key.clone()),
                item.clone(),
            );
        }
        Ok(())
    }

    async fn get(
        &self,
        kind: ItemKind,
        partition_key: &str,
        sort_key: &str,
    ) -> Result<Option<StoredItem>, StoreError> {
        let now = Utc::now().timestamp();
        let items = self.items.read().map_err(|_| StoreError::LockError)?;
        Ok(items
            .get(&(kind, partition_key.to_string(), sort_key.to_string()))
            .filter(|item| !item.is_expired(now))
            .cloned())
    }

    async fn query_partition(
        &self,
        kind: ItemKind,
        partition_key: &str,
        limit: usize,
    ) -> Result<Vec<StoredItem>, StoreError> {
        let now = Utc::now().timestamp();
        let items = self.items.read().map_err(|_| StoreError::LockError)?;

        let mut matching: Vec<StoredItem> = items
            .iter()
            .filter(|((k, p, _), item)| *k == kind && p == partition_key && !item.is_expired(now))
            .map(|(_, item)| item.clone())
            .collect();

        matching.sort_by(|a, b| {
            b.timestamp_secs()
                .total_cmp(&a.timestamp_secs())
                .then_with(|| a.sort_key.cmp(&b.sort_key))
        });
        matching.truncate(limit);
        Ok(matching)
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LogRecord, MetricSample};

    const FAR_FUTURE: i64 = i64::MAX;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = InMemoryStore::new();
        let item = StoredItem::from_sample(
            &MetricSample::new("cpu", 10.0, 1.5).with_tenant("edge-1"),
            FAR_FUTURE,
        );

        store.batch_put(&[item.clone()]).await.unwrap();

        let found = store
            .get(ItemKind::Metric, "edge-1", &item.sort_key)
            .await
            .unwrap();
        assert_eq!(found, Some(item));
        assert_eq!(store.batch_put_calls(), 1);
    }

    #[tokio::test]
    async fn test_same_key_overwrites() {
        let store = InMemoryStore::new();
        let sample = MetricSample::new("cpu", 10.0, 1.0);
        let first = StoredItem::from_sample(&sample, FAR_FUTURE);
        let retry = StoredItem::from_sample(&sample, FAR_FUTURE);

        store.batch_put(&[first]).await.unwrap();
        store.batch_put(&[retry]).await.unwrap();

        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expired_items_hidden() {
        let store = InMemoryStore::new();
        let item = StoredItem::from_sample(&MetricSample::new("cpu", 10.0, 1.0), 1);
        store.batch_put(&[item.clone()]).await.unwrap();

        assert!(store
            .get(ItemKind::Metric, "unknown", &item.sort_key)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .query_partition(ItemKind::Metric, "unknown", 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_query_partition_newest_first() {
        let store = InMemoryStore::new();
        let items: Vec<StoredItem> = [1.0, 3.0, 2.0]
            .iter()
            .map(|ts| StoredItem::from_sample(&MetricSample::new("m", *ts, 0.0), FAR_FUTURE))
            .collect();
        store.batch_put(&items).await.unwrap();
        let other = StoredItem::from_log(&LogRecord::new(5, "INFO", "x"), FAR_FUTURE);
        store.batch_put(&[other]).await.unwrap();

        let newest = store
            .query_partition(ItemKind::Metric, "unknown", 2)
            .await
            .unwrap();
        let times: Vec<f64> = newest.iter().map(StoredItem::timestamp_secs).collect();
        assert_eq!(times, vec![3.0, 2.0]);
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected() {
        let store = InMemoryStore::new().with_max_batch_size(2);
        let items: Vec<StoredItem> = (0..3)
            .map(|i| StoredItem::from_sample(&MetricSample::new("m", f64::from(i), 0.0), FAR_FUTURE))
            .collect();
        assert!(store.batch_put(&items).await.is_err());
        assert!(store.is_empty().unwrap());
    }
}

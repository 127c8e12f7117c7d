//! Chunked, concurrent persistence of a batch.
//!
//! The writer never drops a failed chunk silently: every record of a chunk
//! whose `batch_put` failed (after the store's own retries) is reported in
//! [`WriteReport::failed`] and logged. At most [`StorageWriter::concurrency`]
//! chunks are in flight at once.

use super::{StoreError, StoredItem, TelemetryStore};
use crate::config::RetentionPolicy;
use crate::models::TelemetryBatch;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;

/// Default number of chunks written concurrently.
pub const DEFAULT_WRITE_CONCURRENCY: usize = 8;

/// A record whose write failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRecord {
    /// Partition key of the record.
    pub partition_key: String,
    /// Sort key of the record.
    pub sort_key: String,
    /// Store error message.
    pub error: String,
}

/// Outcome of writing one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    /// Records that landed.
    pub written: usize,
    /// Records whose chunk failed.
    pub failed: Vec<FailedRecord>,
}

impl WriteReport {
    /// True when every record landed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// True when records were attempted and none landed.
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.written == 0 && !self.failed.is_empty()
    }
}

/// Persists canonical batches through a [`TelemetryStore`].
#[derive(Clone)]
pub struct StorageWriter {
    store: Arc<dyn TelemetryStore>,
    retention: RetentionPolicy,
    chunk_size: usize,
    concurrency: usize,
}

impl StorageWriter {
    /// Creates a writer with the default retention and the store's batch limit.
    #[must_use]
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        let chunk_size = store.max_batch_size();
        Self {
            store,
            retention: RetentionPolicy::default(),
            chunk_size,
            concurrency: DEFAULT_WRITE_CONCURRENCY,
        }
    }

    /// Sets the retention policy.
    #[must_use]
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Sets the chunk size, capped by the store's batch limit.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(1, self.store.max_batch_size().max(1));
        self
    }

    /// Sets how many chunks may be in flight at once (at least one).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Maximum chunks in flight.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Effective chunk size.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TelemetryStore> {
        &self.store
    }

    /// Builds stored items for a batch written at `now`.
    #[must_use]
    pub fn items_for(&self, batch: &TelemetryBatch, now: DateTime<Utc>) -> Vec<StoredItem> {
        StoredItem::from_batch(batch, self.retention.expires_at(now))
    }

    /// Writes a batch, stamping items with `now + retention`.
    pub async fn write(&self, batch: &TelemetryBatch) -> WriteReport {
        self.write_at(batch, Utc::now()).await
    }

    /// Writes a batch as if at `now`.
    pub async fn write_at(&self, batch: &TelemetryBatch, now: DateTime<Utc>) -> WriteReport {
        let items = self.items_for(batch, now);
        self.write_items(&items).await
    }

    async fn put_chunk<'a>(
        &self,
        chunk: &'a [StoredItem],
    ) -> (&'a [StoredItem], Result<(), StoreError>) {
        let result = self.store.batch_put(chunk).await;
        (chunk, result)
    }

    /// Writes prepared items in chunks, keeping a bounded number in flight.
    /// Results are collected in chunk order.
    pub async fn write_items(&self, items: &[StoredItem]) -> WriteReport {
        if items.is_empty() {
            return WriteReport::default();
        }

        let puts: Vec<_> = items
            .chunks(self.chunk_size)
            .map(|chunk| self.put_chunk(chunk))
            .collect();
        let results: Vec<_> = stream::iter(puts)
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = WriteReport::default();
        for (chunk, result) in results {
            match result {
                Ok(()) => report.written += chunk.len(),
                Err(e) => {
                    let error = e.to_string();
                    for item in chunk {
                        tracing::error!(
                            partition_key = %item.partition_key,
                            sort_key = %item.sort_key,
                            error = %error,
                            "Failed to store record"
                        );
                        report.failed.push(FailedRecord {
                            partition_key: item.partition_key.clone(),
                            sort_key: item.sort_key.clone(),
                            error: error.clone(),
                        });
                    }
                }
            }
        }

        tracing::debug!(
            written = report.written,
            failed = report.failed.len(),
            chunks = items.len().div_ceil(self.chunk_size),
            "Batch write finished"
        );
        report
    }
}

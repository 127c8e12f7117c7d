//! Tenant (cluster) extraction.
//!
//! The tenant id is the storage partition key and the alert routing key.
//! It is read from `cluster_id`, then from a service-name attribute, and
//! falls back to `"unknown"`.

use crate::models::UNKNOWN;
use std::collections::BTreeMap;

/// Label key carrying the cluster identifier.
pub const CLUSTER_ID_KEY: &str = "cluster_id";

/// Service-name keys consulted when no cluster id is present, in order.
pub const SERVICE_NAME_KEYS: [&str; 2] = ["service.name", "service_name"];

/// Resolves the tenant id from a label or attribute map.
///
/// Empty values are treated as absent.
///
/// # Example
///
/// ```
/// use shared::decode::tenant::tenant_from_labels;
/// use std::collections::BTreeMap;
///
/// let labels = BTreeMap::from([("service.name".to_string(), "api".to_string())]);
/// assert_eq!(tenant_from_labels(&labels), "api");
/// assert_eq!(tenant_from_labels(&BTreeMap::new()), "unknown");
/// ```
#[must_use]
pub fn tenant_from_labels(labels: &BTreeMap<String, String>) -> String {
    std::iter::once(CLUSTER_ID_KEY)
        .chain(SERVICE_NAME_KEYS)
        .find_map(|key| labels.get(key).filter(|v| !v.is_empty()))
        .map_or_else(|| UNKNOWN.to_string(), Clone::clone)
}

/// Tracks the most recently seen tenant of a batch.
///
/// Each record keeps its own tenant; the tracked value only labels log lines
/// and the ingest summary.
#[derive(Debug, Default, Clone)]
pub struct TenantTracker {
    current: Option<String>,
}

impl TenantTracker {
    /// Records a tenant as the most recent one.
    pub fn observe(&mut self, tenant: &str) {
        if self.current.as_deref() != Some(tenant) {
            self.current = Some(tenant.to_string());
        }
    }

    /// The most recently seen tenant, or `"unknown"`.
    #[must_use]
    pub fn current(&self) -> &str {
        self.current.as_deref().unwrap_or(UNKNOWN)
    }

    /// Consumes the tracker, returning the current tenant.
    #[must_use]
    pub fn into_current(self) -> String {
        self.current.unwrap_or_else(|| UNKNOWN.to_string())
    }
}

//! Best-effort alert dispatch.
//!
//! Anomalies are grouped by tenant, formatted into one Markdown message per
//! tenant and handed to a [`Notifier`]. Delivery never fails the caller: a
//! missing target, a missing notifier, a lookup failure or a delivery
//! failure all fall back to logging each anomaly at `warn`.

pub mod target;
pub mod telegram;

pub use target::{ChainedTargets, ClickHouseTargets, StaticTargets, TargetResolver};
pub use telegram::{TelegramNotifier, DEFAULT_TELEGRAM_API_URL};

use crate::models::Anomaly;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default bound on one target lookup plus delivery.
pub const DEFAULT_ALERT_TIMEOUT: Duration = Duration::from_secs(10);

/// Alerting errors. None of these reach the ingestion caller.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The messaging endpoint answered with a non-success status.
    #[error("Delivery rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        body: String,
    },

    /// Lookup or delivery exceeded the configured timeout.
    #[error("Alert delivery timed out")]
    Timeout,

    /// Target resolution failed.
    #[error("Alert target lookup failed: {0}")]
    Lookup(String),

    /// A static target mapping could not be parsed.
    #[error("Invalid alert target mapping '{0}'")]
    InvalidTargets(String),
}

impl AlertError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<reqwest::Error> for AlertError {
    fn from(err: reqwest::Error) -> Self {
        Self::from_reqwest(err)
    }
}

/// Delivers alert text to a target.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends `text` to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be delivered.
    async fn send(&self, target: &str, text: &str) -> Result<(), AlertError>;
}

/// What happened to one tenant's alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The notifier accepted the message.
    Delivered,
    /// No notifier or no target; anomalies were logged instead.
    LoggedOnly,
    /// Delivery was attempted and failed; anomalies were logged instead.
    Failed(String),
    /// There were no anomalies.
    NothingToSend,
}

/// Routes anomalies to per-tenant targets.
#[derive(Clone)]
pub struct AlertDispatcher {
    resolver: Arc<dyn TargetResolver>,
    notifier: Option<Arc<dyn Notifier>>,
    timeout: Duration,
}

impl AlertDispatcher {
    /// Creates a log-only dispatcher using `resolver` for targets.
    #[must_use]
    pub fn new(resolver: Arc<dyn TargetResolver>) -> Self {
        Self {
            resolver,
            notifier: None,
            timeout: DEFAULT_ALERT_TIMEOUT,
        }
    }

    /// Enables delivery through `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the bound applied to lookup and to delivery.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether a notifier is configured.
    #[must_use]
    pub fn can_deliver(&self) -> bool {
        self.notifier.is_some()
    }

    /// Sends one message for `tenant` covering `anomalies`.
    pub async fn dispatch(&self, tenant: &str, anomalies: &[Anomaly]) -> DispatchOutcome {
        if anomalies.is_empty() {
            return DispatchOutcome::NothingToSend;
        }

        let Some(notifier) = &self.notifier else {
            tracing::debug!(tenant, "No notifier configured, logging anomalies");
            log_anomalies(tenant, anomalies);
            return DispatchOutcome::LoggedOnly;
        };

        let target = match tokio::time::timeout(self.timeout, self.resolver.resolve(tenant)).await
        {
            Ok(Ok(Some(target))) => target,
            Ok(Ok(None)) => {
                tracing::warn!(tenant, "No alert target configured for tenant");
                log_anomalies(tenant, anomalies);
                return DispatchOutcome::LoggedOnly;
            }
            Ok(Err(e)) => {
                tracing::error!(tenant, error = %e, "Alert target lookup failed");
                log_anomalies(tenant, anomalies);
                return DispatchOutcome::LoggedOnly;
            }
            Err(_) => {
                tracing::error!(tenant, "Alert target lookup timed out");
                log_anomalies(tenant, anomalies);
                return DispatchOutcome::LoggedOnly;
            }
        };

        let text = format_alert_message(tenant, anomalies);
        let result = match tokio::time::timeout(self.timeout, notifier.send(&target, &text)).await {
            Ok(result) => result,
            Err(_) => Err(AlertError::Timeout),
        };

        match result {
            Ok(()) => {
                tracing::info!(tenant, anomalies = anomalies.len(), "Alert sent");
                DispatchOutcome::Delivered
            }
            Err(e) => {
                tracing::error!(tenant, error = %e, "Alert delivery failed");
                log_anomalies(tenant, anomalies);
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }

    /// Groups `anomalies` by tenant and dispatches each group concurrently.
    ///
    /// Outcomes are returned in tenant order.
    pub async fn dispatch_all(&self, anomalies: &[Anomaly]) -> Vec<(String, DispatchOutcome)> {
        let mut by_tenant: BTreeMap<&str, Vec<Anomaly>> = BTreeMap::new();
        for anomaly in anomalies {
            by_tenant
                .entry(anomaly.tenant_id.as_str())
                .or_default()
                .push(anomaly.clone());
        }

        let deliveries = by_tenant.into_iter().map(|(tenant, group)| async move {
            let outcome = self.dispatch(tenant, &group).await;
            (tenant.to_string(), outcome)
        });
        futures::future::join_all(deliveries).await
    }
}

fn log_anomalies(tenant: &str, anomalies: &[Anomaly]) {
    for anomaly in anomalies {
        tracing::warn!(
            tenant,
            metric = %anomaly.metric_name,
            instance = %anomaly.instance,
            job = %anomaly.job,
            value = anomaly.value,
            timestamp = anomaly.timestamp,
            reason = %anomaly.reason,
            "Anomaly detected"
        );
    }
}

/// Strips backticks so a value cannot break out of a Markdown code span.
fn code(text: &str) -> String {
    format!("`{}`", text.replace('`', ""))
}

fn human_time(anomaly: &Anomaly) -> String {
    anomaly.datetime().map_or_else(
        || anomaly.timestamp.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

/// Builds the Markdown alert text for one tenant.
///
/// Anomalies are grouped by metric name; each line names the instance and
/// job, the value and the sample time.
///
/// # Example
///
/// ```
/// use shared::alert::format_alert_message;
/// use shared::models::Anomaly;
///
/// let anomaly = Anomaly {
///     metric_name: "cpu_pct".to_string(),
///     instance: "node-a".to_string(),
///     job: "node".to_string(),
///     value: 200.0,
///     timestamp: 0.0,
///     reason: "modified z-score 12.00 exceeds threshold 3.50".to_string(),
///     tenant_id: "edge-1".to_string(),
/// };
/// let text = format_alert_message("edge-1", &[anomaly]);
/// assert!(text.contains("`cpu_pct`"));
/// assert!(text.contains("1970-01-01 00:00:00 UTC"));
/// ```
#[must_use]
pub fn format_alert_message(tenant: &str, anomalies: &[Anomaly]) -> String {
    let mut by_metric: BTreeMap<&str, Vec<&Anomaly>> = BTreeMap::new();
    for anomaly in anomalies {
        by_metric
            .entry(anomaly.metric_name.as_str())
            .or_default()
            .push(anomaly);
    }

    let mut text = format!("*Anomaly alert* for cluster {}\n", code(tenant));
    for (metric, group) in &by_metric {
        let _ = write!(text, "\n*Metric* {}\n", code(metric));
        for anomaly in group {
            let _ = writeln!(
                text,
                "- instance {} (job {}): value {} at {}",
                code(&anomaly.instance),
                code(&anomaly.job),
                anomaly.value,
                human_time(anomaly)
            );
        }
    }

    let samples = if anomalies.len() == 1 { "sample" } else { "samples" };
    let metrics = if by_metric.len() == 1 { "metric" } else { "metrics" };
    let _ = write!(
        text,
        "\n{} {samples} across {} {metrics} deviated from their batch median by more than the detection threshold.",
        anomalies.len(),
        by_metric.len()
    );
    text
}

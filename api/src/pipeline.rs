//! The ingestion pipeline.
//!
//! One call handles one request body end to end:
//!
//! 1. reject an empty body
//! 2. check the `x-api-key` credential
//! 3. peel the transport envelope (base64, `Content-Encoding`)
//! 4. decode the payload into a canonical batch
//! 5. persist the batch
//! 6. score metric samples and dispatch alerts
//!
//! Nothing is shared between calls apart from the collaborators held here.

use crate::error::IngestError;
use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use shared::alert::AlertDispatcher;
use shared::decode::envelope::{unwrap_envelope, ContentEncoding};
use shared::decode::{decode, FormatHint};
use shared::detect::AnomalyDetector;
use shared::storage::StorageWriter;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header marking a base64 text body (`x-body-encoding: base64`).
pub const BODY_ENCODING_HEADER: &str = "x-body-encoding";

/// API-gateway style base64 marker (`x-is-base64-encoded: true`).
pub const IS_BASE64_HEADER: &str = "x-is-base64-encoded";

/// Outcome of one successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// `success` when every record landed, `partial` otherwise.
    pub status: String,
    /// Dialect the body was decoded as.
    pub dialect: String,
    /// Records persisted.
    pub accepted: usize,
    /// Records dropped while decoding or storing.
    pub rejected: usize,
    /// Anomalies flagged in the batch.
    pub anomalies: usize,
}

fn header_str<K: header::AsHeaderName>(headers: &HeaderMap, name: K) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Whether the request marks its body as base64 text.
#[must_use]
pub fn is_base64_body(headers: &HeaderMap) -> bool {
    header_str(headers, BODY_ENCODING_HEADER)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("base64"))
        || header_str(headers, IS_BASE64_HEADER)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Decode, persist, detect and alert.
#[derive(Clone)]
pub struct IngestPipeline {
    api_key: String,
    writer: StorageWriter,
    detector: AnomalyDetector,
    dispatcher: AlertDispatcher,
}

impl IngestPipeline {
    /// Creates a pipeline from its collaborators.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        writer: StorageWriter,
        detector: AnomalyDetector,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            writer,
            detector,
            dispatcher,
        }
    }

    /// The storage writer.
    #[must_use]
    pub fn writer(&self) -> &StorageWriter {
        &self.writer
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), IngestError> {
        match header_str(headers, API_KEY_HEADER) {
            Some(key) if key == self.api_key => Ok(()),
            Some(_) => {
                tracing::warn!("Rejected request with wrong API key");
                Err(IngestError::Auth)
            }
            None => {
                tracing::warn!("Rejected request without API key");
                Err(IngestError::Auth)
            }
        }
    }

    /// Runs one request body through the pipeline.
    ///
    /// # Errors
    ///
    /// - [`IngestError::Malformed`] for an empty body, a bad envelope or a
    ///   pinned dialect that fails to decode
    /// - [`IngestError::Auth`] for a missing or wrong API key
    /// - [`IngestError::Ambiguous`] when no dialect accepts the body
    /// - [`IngestError::Storage`] when no record could be stored
    pub async fn ingest(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        hint: FormatHint,
    ) -> Result<IngestSummary, IngestError> {
        if body.is_empty() {
            return Err(IngestError::Malformed("Request body is empty".to_string()));
        }
        self.authorize(headers)?;

        let encoding = ContentEncoding::from_header(header_str(headers, header::CONTENT_ENCODING))?;
        let payload = unwrap_envelope(body, is_base64_body(headers), encoding)?;

        let decoded = decode(&payload, hint).map_err(|e| {
            tracing::warn!(error = %e, "Failed to decode request body");
            IngestError::from(e)
        })?;

        let report = self.writer.write(&decoded.batch).await;
        if report.is_total_failure() {
            tracing::error!(
                tenant = %decoded.current_tenant,
                dialect = %decoded.dialect,
                failed = report.failed.len(),
                "Every record in the batch failed to store"
            );
            let first = report
                .failed
                .first()
                .map_or_else(String::new, |f| f.error.clone());
            return Err(IngestError::Storage(first));
        }

        let anomalies = decoded
            .batch
            .samples()
            .map(|samples| self.detector.detect(samples))
            .unwrap_or_default();

        if !anomalies.is_empty() {
            let outcomes = self.dispatcher.dispatch_all(&anomalies).await;
            for (tenant, outcome) in &outcomes {
                tracing::debug!(tenant = %tenant, ?outcome, "Alert dispatch finished");
            }
        }

        let rejected = decoded.rejected + report.failed.len();
        let summary = IngestSummary {
            status: if report.is_complete() { "success" } else { "partial" }.to_string(),
            dialect: decoded.dialect.as_str().to_string(),
            accepted: report.written,
            rejected,
            anomalies: anomalies.len(),
        };

        tracing::info!(
            tenant = %decoded.current_tenant,
            dialect = %decoded.dialect,
            accepted = summary.accepted,
            rejected = summary.rejected,
            anomalies = summary.anomalies,
            "Ingested batch"
        );

        Ok(summary)
    }
}

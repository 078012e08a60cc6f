//! Accessibility scoring collaborators
//!
//! Two interchangeable strategies behind one seam: a synchronous
//! request/response call to the remote scanning service with the full
//! document bytes, or an asynchronous enqueue that hands the stored
//! artifact key to an out-of-band scorer. The orchestrator does not care
//! which is configured.

use async_trait::async_trait;
use base64::Engine;
use serde_json::json;
use sfr_common::{IngestError, Result};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::events::EventPublisher;
use crate::report::{self, ReportSummary};

/// Scoring input for one record
#[derive(Debug, Clone, Copy)]
pub struct ScoreRequest<'a> {
    pub instance_id: &'a str,
    pub identifier: &'a str,
    /// Complete accumulated document
    pub document: &'a [u8],
    /// Key of the stored artifact, for out-of-band scoring
    pub artifact_key: &'a str,
}

/// Seam to the external accessibility-scanning collaborator
#[async_trait]
pub trait AccessibilityScorer: Send + Sync {
    /// Assess one document. Returns a summary when scoring ran inline,
    /// `None` when it was handed off for out-of-band processing.
    async fn assess(&self, request: ScoreRequest<'_>) -> Result<Option<ReportSummary>>;
}

/// Synchronous strategy: POST the document to the scanning service and
/// reduce its report inline
pub struct RemoteScorer {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteScorer {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl AccessibilityScorer for RemoteScorer {
    #[instrument(skip(self, request), fields(instance_id = request.instance_id))]
    async fn assess(&self, request: ScoreRequest<'_>) -> Result<Option<ReportSummary>> {
        let payload = json!({
            "instanceID": request.instance_id,
            "identifier": request.identifier,
            "documentBytes": base64::engine::general_purpose::STANDARD.encode(request.document),
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| IngestError::AccessibilityReport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::AccessibilityReport(format!(
                "scanning service responded {}",
                status
            )));
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| IngestError::AccessibilityReport(e.to_string()))?;

        let summary = report::summarize(&raw)?;
        debug!(score = summary.score, "Inline accessibility score computed");
        Ok(Some(summary))
    }
}

/// Asynchronous strategy: enqueue the stored artifact key for out-of-band
/// scoring
pub struct QueueScorer {
    publisher: Arc<dyn EventPublisher>,
}

impl QueueScorer {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl AccessibilityScorer for QueueScorer {
    #[instrument(skip(self, request), fields(instance_id = request.instance_id))]
    async fn assess(&self, request: ScoreRequest<'_>) -> Result<Option<ReportSummary>> {
        let payload = json!({
            "instanceID": request.instance_id,
            "identifier": request.identifier,
            "artifactKey": request.artifact_key,
        });

        self.publisher
            .publish(&payload)
            .await
            .map_err(|e| IngestError::AccessibilityReport(e.to_string()))?;

        debug!("Document enqueued for out-of-band scoring");
        Ok(None)
    }
}

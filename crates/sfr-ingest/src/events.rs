//! Result normalization and dispatch
//!
//! Every record terminates in exactly one tagged [`Outcome`], converted
//! once into the wire [`ResultEvent`] shape and handed to the downstream
//! event-stream collaborator. Publish failures are logged and swallowed:
//! they are neither retried nor escalated to the batch, a known gap
//! carried over from the original design.

use async_trait::async_trait;
use aws_sdk_kinesis::{
    config::{Credentials, Region},
    primitives::Blob,
    Client,
};
use serde_json::{json, Value};
use sfr_common::IngestError;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::config::EventsConfig;
use crate::models::{ItemMetadata, ResultEvent};
use crate::report::ReportSummary;
use crate::storage::StoredArtifact;

/// Terminal outcome of one record, exhaustively checkable before it is
/// flattened to the wire shape
#[derive(Debug)]
pub enum Outcome {
    /// The archive was fetched, decomposed, and stored
    Stored {
        id: String,
        archive: StoredArtifact,
        manifest: Option<StoredArtifact>,
        parts_stored: usize,
        summary: Option<ReportSummary>,
        metadata: Option<ItemMetadata>,
    },
    /// The stored artifact was already up to date; nothing was written
    Existing,
    /// Processing failed; the error taxonomy supplies status and code
    Failed(IngestError),
}

impl Outcome {
    /// Flatten to the single normalized result-event shape
    pub fn into_event(self) -> ResultEvent {
        match self {
            Outcome::Stored {
                id,
                archive,
                manifest,
                parts_stored,
                summary,
                metadata,
            } => {
                // The manifest artifact drives the payload address when the
                // archive contained one
                let location = manifest
                    .as_ref()
                    .map(|m| m.location.clone())
                    .unwrap_or_else(|| archive.location.clone());

                let mut data = json!({
                    "id": id,
                    "url": location,
                    "checksum": archive.checksum,
                    "parts": parts_stored,
                });
                if let Some(summary) = summary {
                    data["report"] = json!(summary);
                }
                if let Some(metadata) = metadata {
                    data["metadata"] = json!(metadata);
                }

                ResultEvent {
                    status: 200,
                    code: "stored".to_string(),
                    message: "Stored ePub".to_string(),
                    data: Some(data),
                }
            },
            Outcome::Existing => ResultEvent {
                status: 200,
                code: "existing".to_string(),
                message: "Found existing, up-to-date ePub".to_string(),
                data: None,
            },
            Outcome::Failed(error) => ResultEvent {
                status: error.status(),
                code: error.code().to_string(),
                message: error.to_string(),
                data: None,
            },
        }
    }
}

/// Seam to the outbound event-stream collaborator
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, payload: &Value) -> anyhow::Result<()>;
}

/// Kinesis-backed publisher; safe for concurrent use across records
#[derive(Clone)]
pub struct KinesisPublisher {
    client: Client,
    stream_name: String,
    partition_key: String,
}

impl KinesisPublisher {
    pub fn new(config: &EventsConfig, stream_name: impl Into<String>) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "sfr-events",
        );

        let mut kinesis_config_builder = aws_sdk_kinesis::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint {
            kinesis_config_builder = kinesis_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(kinesis_config_builder.build());
        let stream_name = stream_name.into();

        info!("Event publisher initialized for stream: {}", stream_name);

        Self {
            client,
            stream_name,
            partition_key: config.partition_key.clone(),
        }
    }
}

#[async_trait]
impl EventPublisher for KinesisPublisher {
    #[instrument(skip(self, payload))]
    async fn publish(&self, payload: &Value) -> anyhow::Result<()> {
        let data = serde_json::to_vec(payload)?;

        self.client
            .put_record()
            .stream_name(&self.stream_name)
            .partition_key(&self.partition_key)
            .data(Blob::new(data))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("put_record failed: {}", e))?;

        debug!(stream = %self.stream_name, "Result written to event stream");
        Ok(())
    }
}

/// Normalizes outcomes and dispatches them downstream. Never fails.
pub struct ResultEmitter {
    publisher: Arc<dyn EventPublisher>,
}

impl ResultEmitter {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    /// Convert the outcome and publish it, returning the event either way.
    /// A publish failure is logged and swallowed.
    pub async fn emit(&self, outcome: Outcome) -> ResultEvent {
        let event = outcome.into_event();

        match serde_json::to_value(&event) {
            Ok(payload) => {
                if let Err(e) = self.publisher.publish(&payload).await {
                    error!(code = %event.code, "Failed to publish result event: {}", e);
                }
            },
            Err(e) => {
                error!(code = %event.code, "Failed to serialize result event: {}", e);
            },
        }

        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn artifact(key: &str) -> StoredArtifact {
        StoredArtifact {
            key: key.to_string(),
            location: format!("s3://sfr_epub/{}", key),
            checksum: "abc123".to_string(),
            size: 10,
        }
    }

    #[test]
    fn test_stored_outcome_prefers_manifest_location() {
        let event = Outcome::Stored {
            id: "inst-1".to_string(),
            archive: artifact("123_images.epub"),
            manifest: Some(StoredArtifact {
                key: "123_images.epub/OEBPS/content.opf".to_string(),
                location: "s3://sfr_expl/123_images.epub/OEBPS/content.opf".to_string(),
                checksum: "def456".to_string(),
                size: 4,
            }),
            parts_stored: 3,
            summary: None,
            metadata: None,
        }
        .into_event();

        assert_eq!(event.status, 200);
        assert_eq!(event.code, "stored");
        let data = event.data.unwrap();
        assert_eq!(
            data["url"],
            "s3://sfr_expl/123_images.epub/OEBPS/content.opf"
        );
        assert_eq!(data["parts"], 3);
    }

    #[test]
    fn test_stored_outcome_falls_back_to_archive_location() {
        let event = Outcome::Stored {
            id: "inst-1".to_string(),
            archive: artifact("other.epub"),
            manifest: None,
            parts_stored: 1,
            summary: None,
            metadata: None,
        }
        .into_event();

        assert_eq!(event.data.unwrap()["url"], "s3://sfr_epub/other.epub");
    }

    #[test]
    fn test_existing_outcome_is_success_shaped() {
        let event = Outcome::Existing.into_event();
        assert_eq!(event.status, 200);
        assert_eq!(event.code, "existing");
        assert!(event.data.is_none());
    }

    #[test]
    fn test_failed_outcome_carries_taxonomy_status_and_code() {
        let event = Outcome::Failed(IngestError::Transport {
            status: 404,
            message: "not found".to_string(),
        })
        .into_event();

        assert_eq!(event.status, 404);
        assert_eq!(event.code, "transport-failure");
        assert!(event.data.is_none());
    }

    struct FailingPublisher;

    #[async_trait]
    impl EventPublisher for FailingPublisher {
        async fn publish(&self, _payload: &Value) -> anyhow::Result<()> {
            anyhow::bail!("stream unavailable")
        }
    }

    #[derive(Default)]
    struct CapturingPublisher {
        payloads: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl EventPublisher for CapturingPublisher {
        async fn publish(&self, payload: &Value) -> anyhow::Result<()> {
            self.payloads.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_emit_swallows_publish_failures() {
        let emitter = ResultEmitter::new(Arc::new(FailingPublisher));
        let event = emitter.emit(Outcome::Existing).await;
        // The event is still produced for the caller
        assert_eq!(event.code, "existing");
    }

    #[tokio::test]
    async fn test_emit_publishes_the_wire_shape() {
        let publisher = Arc::new(CapturingPublisher::default());
        let emitter = ResultEmitter::new(publisher.clone());

        emitter
            .emit(Outcome::Failed(IngestError::Regex("bad address".to_string())))
            .await;

        let payloads = publisher.payloads.lock().unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["status"], 400);
        assert_eq!(payloads[0]["code"], "regex-failure");
    }
}

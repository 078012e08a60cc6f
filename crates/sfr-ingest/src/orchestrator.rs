//! Record orchestration and batch fan-out
//!
//! Sequences the per-record pipeline (gate, fetch, tee, decompose +
//! accumulate, store, score, emit) and fans it out over a batch with
//! unordered, independent parallelism. Failures are caught at the record
//! boundary and converted to result events; a batch always runs every
//! record to a terminal outcome.

use futures::StreamExt;
use sfr_common::{IngestError, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::buffer;
use crate::config::BatchConfig;
use crate::events::{Outcome, ResultEmitter};
use crate::fetch;
use crate::filename;
use crate::gate::{self, GateDecision};
use crate::models::{IngestBatch, IngestRecord, ResultEvent};
use crate::scoring::{AccessibilityScorer, ScoreRequest};
use crate::storage::{ObjectStore, Visibility};
use crate::tee;
use crate::{archive, scoring};

/// The assembled pipeline with its injected collaborator handles.
///
/// Every handle is safe for concurrent use by multiple records; no record
/// shares mutable state with another.
pub struct Pipeline {
    http: reqwest::Client,
    archive_store: Arc<dyn ObjectStore>,
    parts_store: Arc<dyn ObjectStore>,
    scorer: Arc<dyn AccessibilityScorer>,
    emitter: ResultEmitter,
    concurrency: usize,
    tee_capacity: usize,
}

impl Pipeline {
    pub fn new(
        http: reqwest::Client,
        archive_store: Arc<dyn ObjectStore>,
        parts_store: Arc<dyn ObjectStore>,
        scorer: Arc<dyn AccessibilityScorer>,
        emitter: ResultEmitter,
        batch: &BatchConfig,
    ) -> Self {
        Self {
            http,
            archive_store,
            parts_store,
            scorer,
            emitter,
            concurrency: batch.concurrency,
            tee_capacity: batch.tee_capacity,
        }
    }

    /// Run every record in the batch to a terminal result event.
    ///
    /// Records are processed with unordered parallelism; results may come
    /// back in any order relative to input order. The batch itself always
    /// completes, regardless of individual record failures.
    #[instrument(skip(self, batch), fields(records = batch.records.len()))]
    pub async fn run_batch(&self, batch: IngestBatch) -> Vec<ResultEvent> {
        let events: Vec<ResultEvent> = futures::stream::iter(batch.records)
            .map(|record| self.process_record(record))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let failed = events.iter().filter(|e| e.status != 200).count();
        info!(
            total = events.len(),
            failed,
            "Batch complete"
        );

        events
    }

    /// Process one record to its terminal outcome and emit it
    async fn process_record(&self, record: IngestRecord) -> ResultEvent {
        let outcome = match self.ingest(&record).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(id = %record.id, url = %record.url, %error, "Record failed");
                Outcome::Failed(error)
            },
        };

        self.emitter.emit(outcome).await
    }

    /// The sequential per-record pipeline; any error short-circuits to the
    /// record boundary
    async fn ingest(&self, record: &IngestRecord) -> Result<Outcome> {
        let file_name = filename::resolve(&record.url, record.file_name.as_deref())?;

        if let GateDecision::Existing =
            gate::check(self.archive_store.as_ref(), &file_name, record.updated).await?
        {
            return Ok(Outcome::Existing);
        }

        let body = fetch::fetch_archive(&self.http, &record.url).await?;

        // One network read feeds both consumers; they run concurrently and
        // both must settle before the record can continue.
        let split = tee::split(body, self.tee_capacity);
        let (decomposed, accumulated) = tokio::join!(
            archive::decompose_and_store(split.left, self.parts_store.clone(), &file_name),
            buffer::accumulate(split.right),
        );
        let decomposed = decomposed?;
        let accumulated = accumulated?;

        let forwarded = split
            .driver
            .await
            .map_err(|e| IngestError::StreamToBuffer(format!("tee driver failed: {}", e)))?;
        debug!(id = %record.id, forwarded, parts = decomposed.parts_stored, "Tee drained");

        let archive_artifact = self
            .archive_store
            .store(&file_name, accumulated.clone(), Visibility::Public)
            .await?;

        let artifact_key = decomposed
            .manifest
            .as_ref()
            .map(|m| m.key.clone())
            .unwrap_or_else(|| archive_artifact.key.clone());

        let summary = self
            .scorer
            .assess(ScoreRequest {
                instance_id: &record.id,
                identifier: &file_name,
                document: &accumulated,
                artifact_key: &artifact_key,
            })
            .await?;

        Ok(Outcome::Stored {
            id: record.id.clone(),
            archive: archive_artifact,
            manifest: decomposed.manifest,
            parts_stored: decomposed.parts_stored,
            summary,
            metadata: record.data.clone(),
        })
    }
}

/// Assemble the production pipeline from configuration
pub fn build_pipeline(config: &crate::config::Config) -> Pipeline {
    use crate::events::{EventPublisher, KinesisPublisher};
    use crate::storage::S3Store;

    let http = reqwest::Client::new();

    let archive_store: Arc<dyn ObjectStore> =
        Arc::new(S3Store::new(&config.storage, config.storage.archive_bucket.clone()));
    let parts_store: Arc<dyn ObjectStore> =
        Arc::new(S3Store::new(&config.storage, config.storage.parts_bucket.clone()));

    let result_publisher: Arc<dyn EventPublisher> = Arc::new(KinesisPublisher::new(
        &config.events,
        config.events.stream_name.clone(),
    ));

    let scorer: Arc<dyn AccessibilityScorer> = match &config.scoring {
        crate::config::ScoringConfig::Remote { url } => {
            Arc::new(scoring::RemoteScorer::new(http.clone(), url.clone()))
        },
        crate::config::ScoringConfig::Queue { stream_name } => {
            let queue: Arc<dyn EventPublisher> =
                Arc::new(KinesisPublisher::new(&config.events, stream_name.clone()));
            Arc::new(scoring::QueueScorer::new(queue))
        },
    };

    Pipeline::new(
        http,
        archive_store,
        parts_store,
        scorer,
        ResultEmitter::new(result_publisher),
        &config.batch,
    )
}

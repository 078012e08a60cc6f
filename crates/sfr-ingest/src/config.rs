//! Configuration management
//!
//! Environment-driven, with defaults suitable for local development
//! against localstack-style endpoints. Clients are constructed once from
//! this config and handed into the orchestrator; there are no process-wide
//! mutable client globals.

use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default bucket for whole archives.
pub const DEFAULT_ARCHIVE_BUCKET: &str = "sfr_epub";

/// Default bucket for exploded archive parts.
pub const DEFAULT_PARTS_BUCKET: &str = "sfr_expl";

/// Default result event stream.
pub const DEFAULT_RESULT_STREAM: &str = "sfr-results";

/// Default partition key for result events.
pub const DEFAULT_PARTITION_KEY: &str = "sfr-epub-ingest";

/// Default number of records processed concurrently per batch.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// Full pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub events: EventsConfig,
    pub scoring: ScoringConfig,
    pub batch: BatchConfig,
}

/// Content storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub path_style: bool,
    pub archive_bucket: String,
    pub parts_bucket: String,
}

/// Outbound event stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub stream_name: String,
    pub partition_key: String,
}

/// Accessibility scoring strategy selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ScoringConfig {
    /// Synchronous request/response against the scanning service
    Remote { url: String },
    /// Asynchronous enqueue for out-of-band scoring
    Queue { stream_name: String },
}

/// Batch processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Records processed concurrently within one batch
    pub concurrency: usize,
    /// Tee channel capacity per consumer branch, in chunks
    pub tee_capacity: usize,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let region =
            std::env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());
        let access_key = std::env::var("AWS_ACCESS_KEY_ID").unwrap_or_default();
        let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default();

        let scoring = match std::env::var("SFR_SCORING_MODE").as_deref() {
            Ok("queue") => ScoringConfig::Queue {
                stream_name: std::env::var("SFR_SCORING_STREAMNAME")
                    .unwrap_or_else(|_| "sfr-scoring".to_string()),
            },
            _ => ScoringConfig::Remote {
                url: std::env::var("SFR_SCORING_URL").unwrap_or_default(),
            },
        };

        let config = Config {
            storage: StorageConfig {
                endpoint: std::env::var("SFR_S3_ENDPOINT").ok(),
                region: region.clone(),
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
                path_style: std::env::var("SFR_S3_PATH_STYLE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
                archive_bucket: std::env::var("SFR_EPUB_BUCKET")
                    .unwrap_or_else(|_| DEFAULT_ARCHIVE_BUCKET.to_string()),
                parts_bucket: std::env::var("SFR_EXPL_BUCKET")
                    .unwrap_or_else(|_| DEFAULT_PARTS_BUCKET.to_string()),
            },
            events: EventsConfig {
                endpoint: std::env::var("AWS_KINESIS_ENDPOINT").ok(),
                region,
                access_key,
                secret_key,
                stream_name: std::env::var("AWS_KINESIS_STREAMNAME")
                    .unwrap_or_else(|_| DEFAULT_RESULT_STREAM.to_string()),
                partition_key: std::env::var("AWS_KINESIS_STREAMID")
                    .unwrap_or_else(|_| DEFAULT_PARTITION_KEY.to_string()),
            },
            scoring,
            batch: BatchConfig {
                concurrency: std::env::var("SFR_BATCH_CONCURRENCY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_BATCH_CONCURRENCY),
                tee_capacity: std::env::var("SFR_TEE_CAPACITY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(crate::tee::DEFAULT_CAPACITY),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.storage.archive_bucket.is_empty() {
            anyhow::bail!("Archive bucket cannot be empty");
        }

        if self.storage.parts_bucket.is_empty() {
            anyhow::bail!("Parts bucket cannot be empty");
        }

        if self.events.stream_name.is_empty() {
            anyhow::bail!("Result stream name cannot be empty");
        }

        if self.batch.concurrency == 0 {
            anyhow::bail!("Batch concurrency must be greater than 0");
        }

        if self.batch.tee_capacity == 0 {
            anyhow::bail!("Tee capacity must be greater than 0");
        }

        if let ScoringConfig::Remote { url } = &self.scoring {
            if url.is_empty() {
                anyhow::bail!(
                    "Remote scoring requires SFR_SCORING_URL (or select SFR_SCORING_MODE=queue)"
                );
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                endpoint: None,
                region: DEFAULT_REGION.to_string(),
                access_key: String::new(),
                secret_key: String::new(),
                path_style: false,
                archive_bucket: DEFAULT_ARCHIVE_BUCKET.to_string(),
                parts_bucket: DEFAULT_PARTS_BUCKET.to_string(),
            },
            events: EventsConfig {
                endpoint: None,
                region: DEFAULT_REGION.to_string(),
                access_key: String::new(),
                secret_key: String::new(),
                stream_name: DEFAULT_RESULT_STREAM.to_string(),
                partition_key: DEFAULT_PARTITION_KEY.to_string(),
            },
            scoring: ScoringConfig::Queue {
                stream_name: "sfr-scoring".to_string(),
            },
            batch: BatchConfig {
                concurrency: DEFAULT_BATCH_CONCURRENCY,
                tee_capacity: crate::tee::DEFAULT_CAPACITY,
            },
        }
    }
}

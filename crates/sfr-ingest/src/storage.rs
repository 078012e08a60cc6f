//! Artifact persistence against content storage
//!
//! The pipeline talks to storage through the narrow [`ObjectStore`]
//! contract: a conditional existence probe and a keyed put. The production
//! implementation is S3-backed; tests substitute in-memory stores.

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::SdkError,
    types::ObjectCannedAcl,
    Client,
};
use chrono::{DateTime, Utc};
use sfr_common::{checksum, IngestError, Result};
use tracing::{debug, info, instrument};

use crate::config::StorageConfig;

/// Requested access level for a stored artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Outcome of a conditional existence probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// No object is stored under the key
    Missing,
    /// An object exists but is older than the caller's timestamp
    Stale,
    /// The stored object already satisfies the "unless newer" condition
    /// (precondition-failed)
    UpToDate,
}

/// Address and integrity descriptor of one stored artifact
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub key: String,
    pub location: String,
    pub checksum: String,
    pub size: i64,
}

/// Narrow storage contract used by the pipeline
///
/// Implementations must be safe for concurrent use by multiple records;
/// every write is independently addressed by key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Conditional existence probe using `if_unmodified_since` as the
    /// "unless newer than" precondition.
    async fn probe(
        &self,
        key: &str,
        if_unmodified_since: DateTime<Utc>,
    ) -> Result<ProbeOutcome>;

    /// Upload bytes under the key and report the resulting address.
    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        visibility: Visibility,
    ) -> Result<StoredArtifact>;
}

/// Storage key for one exploded archive part
pub fn part_key(file_name: &str, entry_path: &str) -> String {
    format!("{}/{}", file_name, entry_path)
}

/// S3-backed object store, one handle per bucket
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(config: &StorageConfig, bucket: impl Into<String>) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "sfr-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());
        let bucket = bucket.into();

        info!("Storage client initialized for bucket: {}", bucket);

        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    #[instrument(skip(self))]
    async fn probe(
        &self,
        key: &str,
        if_unmodified_since: DateTime<Utc>,
    ) -> Result<ProbeOutcome> {
        debug!("Probing s3://{}/{}", self.bucket, key);

        let condition = aws_sdk_s3::primitives::DateTime::from_millis(
            if_unmodified_since.timestamp_millis(),
        );

        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .if_unmodified_since(condition)
            .send()
            .await
        {
            Ok(_) => Ok(ProbeOutcome::Stale),
            Err(e) => {
                if let SdkError::ServiceError(ctx) = &e {
                    match ctx.raw().status().as_u16() {
                        412 => return Ok(ProbeOutcome::UpToDate),
                        404 => return Ok(ProbeOutcome::Missing),
                        _ => {},
                    }
                    if ctx.err().is_not_found() {
                        return Ok(ProbeOutcome::Missing);
                    }
                }
                // Any other failure is ambiguous; surface it unchanged
                Err(IngestError::Store(format!(
                    "existence probe failed for {}: {}",
                    key, e
                )))
            },
        }
    }

    #[instrument(skip(self, bytes))]
    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        visibility: Visibility,
    ) -> Result<StoredArtifact> {
        let checksum = checksum::sha256_hex(&bytes);
        let size = bytes.len() as i64;

        debug!("Uploading {} bytes to s3://{}/{}", size, self.bucket, key);

        let acl = match visibility {
            Visibility::Public => ObjectCannedAcl::PublicRead,
            Visibility::Private => ObjectCannedAcl::Private,
        };

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .acl(acl)
            .body(aws_sdk_s3::primitives::ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                IngestError::Store(format!("upload failed for {}: {}", key, e))
            })?;

        info!("Successfully uploaded to s3://{}/{}", self.bucket, key);

        Ok(StoredArtifact {
            key: key.to_string(),
            location: format!("s3://{}/{}", self.bucket, key),
            checksum,
            size,
        })
    }
}

use dashmap::DashMap;
use object_store::{ObjectStore, RetryConfig};
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::CloudConfig;
use crate::error::ServiceResult;

/// Bucket + key of an uploaded document or image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub bucket: String,
    pub key: String,
}

impl ArtifactRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// Opens an object store bound to one bucket.
pub trait BucketProvider: Send + Sync {
    fn open(&self, bucket: &str) -> ServiceResult<Arc<dyn ObjectStore>>;
}

/// S3 (or any S3-compatible endpoint) through `object_store`.
pub struct S3Buckets {
    config: CloudConfig,
}

impl S3Buckets {
    pub fn new(config: CloudConfig) -> Self {
        Self { config }
    }
}

impl BucketProvider for S3Buckets {
    fn open(&self, bucket: &str) -> ServiceResult<Arc<dyn ObjectStore>> {
        // Picks up AWS_* credentials from the environment
        let mut builder = AmazonS3Builder::from_env()
            .with_region(&self.config.region)
            .with_bucket_name(bucket)
            .with_allow_http(self.config.storage.allow_http)
            .with_retry(single_attempt());

        if let Some(endpoint) = self.config.storage_endpoint() {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(key_id) = &self.config.storage.access_key_id {
            builder = builder.with_access_key_id(key_id);
        }
        if let Some(secret) = &self.config.storage.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }

        let store = builder.build()?;
        Ok(Arc::new(store))
    }
}

/// Every storage request is tried exactly once
fn single_attempt() -> RetryConfig {
    RetryConfig {
        max_retries: 0,
        ..RetryConfig::default()
    }
}

/// Process-local buckets, created on first use.
#[derive(Default)]
pub struct MemoryBuckets {
    buckets: DashMap<String, Arc<InMemory>>,
}

impl MemoryBuckets {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BucketProvider for MemoryBuckets {
    fn open(&self, bucket: &str) -> ServiceResult<Arc<dyn ObjectStore>> {
        let store = self
            .buckets
            .entry(bucket.to_string())
            .or_insert_with(|| Arc::new(InMemory::new()))
            .clone();
        Ok(store)
    }
}

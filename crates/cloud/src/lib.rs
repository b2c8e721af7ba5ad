pub mod comprehend;
pub mod config;
pub mod error;
pub mod functions;
pub mod identity;
pub mod model;
pub mod notice;
pub mod orchestrator;
pub mod protocol;
pub mod storage;

#[cfg(any(test, feature = "testing"))]
pub mod fakes;

pub use comprehend::{
    ClassLabel, ComprehendClient, DocumentClassifier, PiiEntity, Sentiment, SentimentResult,
    SentimentScore, TextAnalysis, ToxicityResult,
};
pub use config::{CloudConfig, IdentityPoolConfig, StorageBackend, StorageConfig};
pub use error::{ServiceError, ServiceResult};
pub use functions::{FunctionInvoker, LambdaClient};
pub use identity::{AuthOutcome, CognitoClient, IdentityProvider};
pub use model::{BedrockClient, GuardrailRef, InvokeRequest, ModelEndpoint, ModelResponse};
pub use notice::{Level, Notice, Notices};
pub use orchestrator::{
    ExecutionDescription, ExecutionHandle, ExecutionStatus, StatesClient, WorkflowOrchestrator,
};
pub use storage::{ArtifactRef, BucketProvider, MemoryBuckets, S3Buckets};

use anyhow::{Context, Result};
use std::sync::Arc;

/// Every external service the dashboards talk to.
#[derive(Clone)]
pub struct Clients {
    pub buckets: Arc<dyn BucketProvider>,
    pub orchestrator: Arc<dyn WorkflowOrchestrator>,
    pub model: Arc<dyn ModelEndpoint>,
    pub identity: Arc<dyn IdentityProvider>,
    pub text: Arc<dyn TextAnalysis>,
    pub classifier: Arc<dyn DocumentClassifier>,
    pub functions: Arc<dyn FunctionInvoker>,
}

impl Clients {
    /// Build the HTTP clients for the configured region or gateway
    pub fn connect(config: &CloudConfig) -> Result<Self> {
        anyhow::ensure!(
            config.gateway_url.is_some(),
            "cloud.gateway_url is not set: service calls are unsigned and must go through a signing gateway"
        );

        let http = protocol::http_client(config.request_timeout_secs)
            .context("Failed to build HTTP client")?;

        let buckets: Arc<dyn BucketProvider> = match config.storage.backend {
            StorageBackend::S3 => Arc::new(S3Buckets::new(config.clone())),
            StorageBackend::Memory => Arc::new(MemoryBuckets::new()),
        };

        // Text analysis and classification share one client
        let comprehend = Arc::new(ComprehendClient::new(config.endpoint("comprehend"), http.clone()));

        tracing::info!(
            region = %config.region,
            gateway = config.gateway_url.as_deref().unwrap_or("none"),
            storage = ?config.storage.backend,
            "Cloud clients configured"
        );

        Ok(Self {
            buckets,
            orchestrator: Arc::new(StatesClient::new(config.endpoint("states"), http.clone())),
            model: Arc::new(BedrockClient::new(config.endpoint("bedrock-runtime"), http.clone())),
            identity: Arc::new(CognitoClient::new(
                config.endpoint("cognito-idp"),
                config.identity.user_pool_id.clone(),
                config.identity.client_id.clone(),
                http.clone(),
            )),
            text: comprehend.clone(),
            classifier: comprehend,
            functions: Arc::new(LambdaClient::new(config.endpoint("lambda"), http)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_requires_gateway() {
        let err = Clients::connect(&CloudConfig::default()).err().unwrap();
        assert!(err.to_string().contains("gateway_url"));

        let config = CloudConfig {
            gateway_url: Some("http://localhost:4566".to_string()),
            ..CloudConfig::default()
        };
        assert!(Clients::connect(&config).is_ok());
    }
}

use cloud::ArtifactRef;
use serde_json::{Value, json};

/// Execution input naming the artifact's location
pub fn artifact_payload(artifact: &ArtifactRef) -> Value {
    json!({
        "detail": {
            "s3_bucket": artifact.bucket,
            "s3_key": artifact.key,
        }
    })
}

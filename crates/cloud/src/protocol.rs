use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};

/// Client for services speaking the AWS JSON protocol: every operation is a
/// POST to the service root, selected by the `X-Amz-Target` header.
#[derive(Clone)]
pub struct JsonProtocolClient {
    base_url: String,
    service: &'static str,
    target_prefix: &'static str,
    content_type: &'static str,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    kind: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

impl JsonProtocolClient {
    pub fn new(
        base_url: String,
        service: &'static str,
        target_prefix: &'static str,
        json_version: &'static str,
        client: reqwest::Client,
    ) -> Self {
        let content_type = match json_version {
            "1.0" => "application/x-amz-json-1.0",
            _ => "application/x-amz-json-1.1",
        };
        Self {
            base_url,
            service,
            target_prefix,
            content_type,
            client,
        }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Call one operation, e.g. `call("DetectSentiment", &req)`
    pub async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> ServiceResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(request).map_err(|e| {
            ServiceError::InvalidRequest(format!("{} {}: {}", self.service, operation, e))
        })?;

        tracing::debug!(service = self.service, operation, "Calling service");

        let response = self
            .client
            .post(&self.base_url)
            .header("Content-Type", self.content_type)
            .header("X-Amz-Target", format!("{}.{}", self.target_prefix, operation))
            .body(body)
            .send()
            .await
            .map_err(|source| ServiceError::Transport {
                service: self.service,
                source,
            })?;

        decode_response(self.service, response).await
    }
}

/// Turn an HTTP response into `Resp`, or an `Api` error carrying the
/// service's error type and message.
pub async fn decode_response<Resp: DeserializeOwned>(
    service: &'static str,
    response: reqwest::Response,
) -> ServiceResult<Resp> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|source| ServiceError::Transport { service, source })?;

    if !status.is_success() {
        return Err(api_error(service, status.as_u16(), &bytes));
    }

    serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode {
        service,
        reason: e.to_string(),
    })
}

pub fn api_error(service: &'static str, status: u16, body: &[u8]) -> ServiceError {
    let parsed: Option<ErrorBody> = serde_json::from_slice(body).ok();
    let (kind, message) = match parsed {
        Some(err) => (
            err.kind.unwrap_or_else(|| "UnknownError".to_string()),
            err.message
                .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned()),
        ),
        None => (
            "UnknownError".to_string(),
            String::from_utf8_lossy(body).into_owned(),
        ),
    };

    // `__type` may be namespaced: "com.amazonaws...#AccessDeniedException"
    let kind = kind.rsplit('#').next().unwrap_or_default().to_string();

    ServiceError::Api {
        service,
        status,
        kind,
        message,
    }
}

pub fn http_client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

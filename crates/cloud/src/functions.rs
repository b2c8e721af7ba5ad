use async_trait::async_trait;

use crate::error::{ServiceError, ServiceResult};
use crate::protocol::decode_response;

#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    /// Synchronous (`RequestResponse`) invocation
    async fn invoke(
        &self,
        function_name: &str,
        payload: &serde_json::Value,
    ) -> ServiceResult<serde_json::Value>;
}

#[derive(Clone)]
pub struct LambdaClient {
    base_url: String,
    client: reqwest::Client,
}

impl LambdaClient {
    pub fn new(base_url: String, client: reqwest::Client) -> Self {
        Self { base_url, client }
    }

    fn invocation_url(&self, function_name: &str) -> ServiceResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ServiceError::InvalidRequest(format!("bad lambda endpoint: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::InvalidRequest("lambda endpoint cannot be a base".into()))?
            .pop_if_empty()
            .extend(["2015-03-31", "functions", function_name, "invocations"]);
        Ok(url)
    }
}

#[async_trait]
impl FunctionInvoker for LambdaClient {
    async fn invoke(
        &self,
        function_name: &str,
        payload: &serde_json::Value,
    ) -> ServiceResult<serde_json::Value> {
        let url = self.invocation_url(function_name)?;

        let response = self
            .client
            .post(url)
            .header("X-Amz-Invocation-Type", "RequestResponse")
            .json(payload)
            .send()
            .await
            .map_err(|source| ServiceError::Transport {
                service: "lambda",
                source,
            })?;

        // Function errors come back as 200 with this header set
        let function_error = response
            .headers()
            .get("X-Amz-Function-Error")
            .map(|v| v.to_str().unwrap_or("Unhandled").to_string());
        if let Some(kind) = function_error {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                service: "lambda",
                status: 200,
                kind,
                message,
            });
        }

        decode_response("lambda", response).await
    }
}

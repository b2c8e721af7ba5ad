use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};
use crate::protocol::decode_response;

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Named, versioned content-safety policy applied at invocation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailRef {
    pub id: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct InvokeRequest<'a> {
    pub model_id: &'a str,
    pub guardrail: &'a GuardrailRef,
    pub max_tokens: u32,
    pub prompt: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub block_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Anthropic messages response body (also embedded in workflow output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

impl ModelResponse {
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|b| b.text.as_deref())
    }
}

#[async_trait]
pub trait ModelEndpoint: Send + Sync {
    async fn invoke(&self, request: &InvokeRequest<'_>) -> ServiceResult<ModelResponse>;
}

#[derive(Clone)]
pub struct BedrockClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<TextContent<'a>>,
}

#[derive(Serialize)]
struct TextContent<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    text: &'a str,
}

impl BedrockClient {
    pub fn new(base_url: String, client: reqwest::Client) -> Self {
        Self { base_url, client }
    }

    fn invoke_url(&self, model_id: &str) -> ServiceResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ServiceError::InvalidRequest(format!("bad model endpoint: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::InvalidRequest("model endpoint cannot be a base".into()))?
            .pop_if_empty()
            .extend(["model", model_id, "invoke"]);
        Ok(url)
    }
}

#[async_trait]
impl ModelEndpoint for BedrockClient {
    async fn invoke(&self, request: &InvokeRequest<'_>) -> ServiceResult<ModelResponse> {
        let url = self.invoke_url(request.model_id)?;
        let body = MessagesRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: request.max_tokens,
            messages: vec![Message {
                role: "user",
                content: vec![TextContent {
                    content_type: "text",
                    text: request.prompt,
                }],
            }],
        };

        tracing::debug!(
            model = request.model_id,
            guardrail = %request.guardrail.id,
            max_tokens = request.max_tokens,
            "Invoking model"
        );

        let response = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .header("X-Amzn-Bedrock-GuardrailIdentifier", &request.guardrail.id)
            .header("X-Amzn-Bedrock-GuardrailVersion", &request.guardrail.version)
            .json(&body)
            .send()
            .await
            .map_err(|source| ServiceError::Transport {
                service: "bedrock-runtime",
                source,
            })?;

        decode_response("bedrock-runtime", response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_url_encodes_model_id() {
        let client = BedrockClient::new(
            "https://bedrock-runtime.us-west-2.amazonaws.com".to_string(),
            reqwest::Client::new(),
        );
        let url = client
            .invoke_url("anthropic.claude-3-haiku-20240307-v1:0")
            .unwrap();
        assert_eq!(
            url.path(),
            "/model/anthropic.claude-3-haiku-20240307-v1:0/invoke"
        );
    }

    #[test]
    fn test_first_text_skips_non_text_blocks() {
        let json = r#"{"content":[{"type":"tool_use"},{"type":"text","text":"hello"}]}"#;
        let response: ModelResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.first_text(), Some("hello"));
    }
}

use cloud::{GuardrailRef, InvokeRequest, ModelEndpoint, Notices};
use std::sync::Arc;

use crate::prompt::build_grounded_prompt;

pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Model invocation under a content guardrail, grounded on a dataset.
#[derive(Clone)]
pub struct GuardedGenerator {
    model: Arc<dyn ModelEndpoint>,
    model_id: String,
    max_tokens: u32,
    domain: String,
}

impl GuardedGenerator {
    pub fn new(model: Arc<dyn ModelEndpoint>, model_id: String, domain: String) -> Self {
        Self {
            model,
            model_id,
            max_tokens: DEFAULT_MAX_TOKENS,
            domain,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// First text block of the answer, or `None` after reporting the failure.
    /// Callers must not run downstream analysis on `None`.
    pub async fn generate(
        &self,
        question: &str,
        dataset: &str,
        guardrail: &GuardrailRef,
        notices: &mut Notices,
    ) -> Option<String> {
        let prompt = build_grounded_prompt(&self.domain, dataset, question);
        let request = InvokeRequest {
            model_id: &self.model_id,
            guardrail,
            max_tokens: self.max_tokens,
            prompt: &prompt,
        };

        let response = match self.model.invoke(&request).await {
            Ok(response) => response,
            Err(e) => {
                notices.failure("Failed to generate analysis", e);
                return None;
            }
        };

        match response.first_text() {
            Some(text) => {
                tracing::info!(
                    model = %self.model_id,
                    guardrail = %guardrail.id,
                    chars = text.len(),
                    "Generated analysis"
                );
                Some(text.to_string())
            }
            None => {
                notices.error("Failed to generate analysis: the model returned no text");
                None
            }
        }
    }
}

use cloud::ModelResponse;
use serde::Deserialize;

use crate::markers::DecisionRationale;

/// Output of the underwriting workflow: the model response it produced,
/// wrapped under `Body`.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowOutput {
    #[serde(rename = "Body")]
    pub body: ModelResponse,
}

impl WorkflowOutput {
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Decision and rationale from the first text block, if any
    pub fn decision(&self) -> Option<DecisionRationale> {
        self.body.first_text().map(DecisionRationale::parse)
    }
}

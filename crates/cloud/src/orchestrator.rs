use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ServiceError, ServiceResult};
use crate::protocol::JsonProtocolClient;

/// Opaque identifier of one workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionHandle(String);

impl ExecutionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Aborted,
    PendingRedrive,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Succeeded
                | ExecutionStatus::Failed
                | ExecutionStatus::TimedOut
                | ExecutionStatus::Aborted
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Succeeded => "SUCCEEDED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::TimedOut => "TIMED_OUT",
            ExecutionStatus::Aborted => "ABORTED",
            ExecutionStatus::PendingRedrive => "PENDING_REDRIVE",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionDescription {
    pub status: ExecutionStatus,
    /// Raw JSON output, present once the execution succeeded
    pub output: Option<String>,
}

#[async_trait]
pub trait WorkflowOrchestrator: Send + Sync {
    async fn start_execution(
        &self,
        workflow_id: &str,
        input: &serde_json::Value,
    ) -> ServiceResult<ExecutionHandle>;

    async fn describe_execution(&self, handle: &ExecutionHandle)
    -> ServiceResult<ExecutionDescription>;
}

/// Step Functions over the JSON 1.0 protocol.
pub struct StatesClient {
    protocol: JsonProtocolClient,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartExecutionRequest<'a> {
    state_machine_arn: &'a str,
    input: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartExecutionResponse {
    execution_arn: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeExecutionRequest<'a> {
    execution_arn: &'a str,
}

#[derive(Deserialize)]
struct DescribeExecutionResponse {
    status: ExecutionStatus,
    #[serde(default)]
    output: Option<String>,
}

impl StatesClient {
    pub fn new(base_url: String, client: reqwest::Client) -> Self {
        Self {
            protocol: JsonProtocolClient::new(base_url, "states", "AWSStepFunctions", "1.0", client),
        }
    }
}

#[async_trait]
impl WorkflowOrchestrator for StatesClient {
    async fn start_execution(
        &self,
        workflow_id: &str,
        input: &serde_json::Value,
    ) -> ServiceResult<ExecutionHandle> {
        let input = serde_json::to_string(input)
            .map_err(|e| ServiceError::InvalidRequest(e.to_string()))?;
        let request = StartExecutionRequest {
            state_machine_arn: workflow_id,
            input,
        };

        let response: StartExecutionResponse =
            self.protocol.call("StartExecution", &request).await?;
        Ok(ExecutionHandle(response.execution_arn))
    }

    async fn describe_execution(
        &self,
        handle: &ExecutionHandle,
    ) -> ServiceResult<ExecutionDescription> {
        let request = DescribeExecutionRequest {
            execution_arn: handle.as_str(),
        };

        let response: DescribeExecutionResponse =
            self.protocol.call("DescribeExecution", &request).await?;
        Ok(ExecutionDescription {
            status: response.status,
            output: response.output,
        })
    }
}

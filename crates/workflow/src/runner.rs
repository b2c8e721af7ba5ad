use cloud::{ArtifactRef, ExecutionHandle, ExecutionStatus, Notices, WorkflowOrchestrator};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::payload::artifact_payload;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Starts workflow executions and blocks until they finish.
#[derive(Clone)]
pub struct WorkflowRunner {
    orchestrator: Arc<dyn WorkflowOrchestrator>,
    poll_interval: Duration,
}

impl WorkflowRunner {
    pub fn new(orchestrator: Arc<dyn WorkflowOrchestrator>) -> Self {
        Self {
            orchestrator,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub async fn start(
        &self,
        workflow_id: &str,
        input: &Value,
        notices: &mut Notices,
    ) -> Option<ExecutionHandle> {
        match self.orchestrator.start_execution(workflow_id, input).await {
            Ok(handle) => {
                info!(workflow = workflow_id, execution = %handle, "Started workflow execution");
                Some(handle)
            }
            Err(e) => {
                notices.failure("An error occurred while starting the workflow", e);
                None
            }
        }
    }

    /// Poll until a terminal status. Takes the handle: nothing else may poll
    /// it meanwhile. There is no timeout; the remote execution bounds it.
    pub async fn wait_for_result(
        &self,
        handle: ExecutionHandle,
        notices: &mut Notices,
    ) -> Option<Value> {
        let mut polls = 0u64;

        loop {
            polls += 1;
            let description = match self.orchestrator.describe_execution(&handle).await {
                Ok(description) => description,
                Err(e) => {
                    notices.failure("An error occurred while retrieving execution result", e);
                    return None;
                }
            };

            match description.status {
                ExecutionStatus::Succeeded => {
                    info!(execution = %handle, polls, "Workflow execution succeeded");
                    return parse_output(description.output.as_deref(), notices);
                }
                status @ (ExecutionStatus::Failed
                | ExecutionStatus::TimedOut
                | ExecutionStatus::Aborted) => {
                    warn!(execution = %handle, %status, polls, "Workflow execution did not succeed");
                    notices.error(format!("Workflow execution failed with status: {}", status));
                    return None;
                }
                status => {
                    debug!(execution = %handle, %status, polls, "Workflow still running");
                    sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Dispatch an artifact to a workflow and wait for its output
    pub async fn run(
        &self,
        workflow_id: &str,
        artifact: &ArtifactRef,
        notices: &mut Notices,
    ) -> Option<Value> {
        let input = artifact_payload(artifact);
        let handle = self.start(workflow_id, &input, notices).await?;
        notices.info("Workflow started, waiting for result...");
        self.wait_for_result(handle, notices).await
    }
}

fn parse_output(output: Option<&str>, notices: &mut Notices) -> Option<Value> {
    let Some(raw) = output else {
        notices.error("Workflow execution succeeded without output");
        return None;
    };
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            notices.failure("Workflow output is not valid JSON", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloud::fakes::FakeOrchestrator;

    const STATE_MACHINE: &str = "arn:aws:states:us-east-1:000000000000:stateMachine:Underwriting";

    fn runner(orchestrator: Arc<FakeOrchestrator>) -> WorkflowRunner {
        WorkflowRunner::new(orchestrator).with_poll_interval(Duration::from_millis(1))
    }

    fn handle() -> ExecutionHandle {
        ExecutionHandle::new("arn:execution")
    }

    #[tokio::test]
    async fn test_running_then_succeeded_returns_output_once() {
        let orchestrator = Arc::new(
            FakeOrchestrator::new()
                .then_status(ExecutionStatus::Running)
                .then_status(ExecutionStatus::Running)
                .then_output(r#"{"Body":{"content":[]}}"#),
        );
        let mut notices = Notices::new();

        let output = runner(orchestrator.clone())
            .wait_for_result(handle(), &mut notices)
            .await;

        assert_eq!(output.unwrap()["Body"]["content"], serde_json::json!([]));
        assert_eq!(orchestrator.describe_count(), 3);
        assert!(notices.is_empty());
    }

    #[tokio::test]
    async fn test_terminal_failures_yield_none() {
        for status in [
            ExecutionStatus::Failed,
            ExecutionStatus::TimedOut,
            ExecutionStatus::Aborted,
        ] {
            let orchestrator = Arc::new(
                FakeOrchestrator::new()
                    .then_status(ExecutionStatus::Running)
                    .then_status(status),
            );
            let mut notices = Notices::new();

            let output = runner(orchestrator.clone())
                .wait_for_result(handle(), &mut notices)
                .await;

            assert!(output.is_none());
            assert_eq!(orchestrator.describe_count(), 2);
            assert_eq!(
                notices.iter().next().unwrap().message,
                format!("Workflow execution failed with status: {}", status)
            );
        }
    }

    #[tokio::test]
    async fn test_pending_redrive_keeps_polling() {
        let orchestrator = Arc::new(
            FakeOrchestrator::new()
                .then_status(ExecutionStatus::PendingRedrive)
                .then_output("{}"),
        );
        let mut notices = Notices::new();

        let output = runner(orchestrator.clone())
            .wait_for_result(handle(), &mut notices)
            .await;

        assert!(output.is_some());
        assert_eq!(orchestrator.describe_count(), 2);
    }

    #[tokio::test]
    async fn test_describe_error_ends_loop() {
        let orchestrator = Arc::new(
            FakeOrchestrator::new()
                .then_status(ExecutionStatus::Running)
                .then_error(),
        );
        let mut notices = Notices::new();

        let output = runner(orchestrator).wait_for_result(handle(), &mut notices).await;

        assert!(output.is_none());
        assert!(notices.has_errors());
    }

    #[tokio::test]
    async fn test_invalid_output_is_reported() {
        let orchestrator = Arc::new(FakeOrchestrator::new().then_output("not json"));
        let mut notices = Notices::new();

        let output = runner(orchestrator).wait_for_result(handle(), &mut notices).await;

        assert!(output.is_none());
        assert!(notices.has_errors());
    }

    #[tokio::test]
    async fn test_run_sends_artifact_payload() {
        let orchestrator = Arc::new(FakeOrchestrator::new().then_output(r#"{"ok":true}"#));
        let artifact = ArtifactRef::new("bucket", "license.jpg");
        let mut notices = Notices::new();

        let output = runner(orchestrator.clone())
            .run(STATE_MACHINE, &artifact, &mut notices)
            .await;

        assert_eq!(output.unwrap()["ok"], true);
        let started = orchestrator.started.lock().unwrap();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].0, STATE_MACHINE);
        assert_eq!(started[0].1["detail"]["s3_key"], "license.jpg");
    }

    #[tokio::test]
    async fn test_failed_dispatch_never_polls() {
        let orchestrator = Arc::new(FakeOrchestrator::failing_start());
        let artifact = ArtifactRef::new("bucket", "license.jpg");
        let mut notices = Notices::new();

        let output = runner(orchestrator.clone())
            .run(STATE_MACHINE, &artifact, &mut notices)
            .await;

        assert!(output.is_none());
        assert_eq!(orchestrator.describe_count(), 0);
        assert!(notices.has_errors());
    }
}

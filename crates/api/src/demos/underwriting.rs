use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::routing::{get, post, put};
use axum::Json;
use cloud::Notices;
use extract::{DecisionRationale, WorkflowOutput};
use ingest::ArtifactCatalog;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;
use workflow::WorkflowRunner;

use super::{Dashboard, Demo};
use crate::AppState;
use crate::error::{ActionResponse, Outcome};
use crate::metrics::TimedOperation;

const PAGE: &str = include_str!("../../ui/underwriting.html");

/// Upload limit for document photos (axum defaults to 2 MiB)
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub struct UnderwritingDashboard;

impl Dashboard for UnderwritingDashboard {
    fn demo(&self) -> Demo {
        Demo::Underwriting
    }

    fn body(&self) -> &'static str {
        PAGE
    }

    fn routes(&self) -> Router<AppState> {
        Router::new()
            .route("/artifacts", get(list_artifacts))
            .route(
                "/artifacts/:name",
                put(upload_artifact).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
            )
            .route("/run", post(run_underwriting))
    }
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct RunResult {
    pub key: String,
    pub decision: String,
    pub rationale: String,
}

fn open_catalog(state: &AppState, notices: &mut Notices) -> Option<ArtifactCatalog> {
    let config = &state.config.underwriting;
    match ArtifactCatalog::open(state.underwriting.buckets.as_ref(), &config.bucket) {
        Ok(catalog) => Some(match &config.prefix {
            Some(prefix) => catalog.with_prefix(prefix),
            None => catalog,
        }),
        Err(e) => {
            notices.failure("An error occurred while opening the bucket", e);
            None
        }
    }
}

/// Lower-cased extension, if it is one the workflow accepts
fn accepted_extension<'a>(name: &str, allowed: &'a [String]) -> Option<&'a str> {
    let (_, ext) = name.rsplit_once('.')?;
    allowed
        .iter()
        .find(|a| a.eq_ignore_ascii_case(ext))
        .map(String::as_str)
}

/// GET /api/underwriting/artifacts
async fn list_artifacts(State(state): State<AppState>) -> ActionResponse<Vec<String>> {
    let mut notices = Notices::new();
    let keys = match open_catalog(&state, &mut notices) {
        Some(catalog) => catalog.list_keys(&mut notices).await,
        None => Vec::new(),
    };
    state.metrics.record_request(true);
    ActionResponse::ok(keys, notices)
}

/// PUT /api/underwriting/artifacts/:name
async fn upload_artifact(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> ActionResponse<String> {
    let mut notices = Notices::new();
    let allowed = &state.config.underwriting.allowed_extensions;

    if accepted_extension(&name, allowed).is_none() {
        notices.warning(format!(
            "Unsupported file type. Please upload one of: {}",
            allowed.join(", ")
        ));
        return ActionResponse::failed(Outcome::MissingInput, notices);
    }
    if body.is_empty() {
        notices.warning("Please upload an image file.");
        return ActionResponse::failed(Outcome::MissingInput, notices);
    }

    let Some(catalog) = open_catalog(&state, &mut notices) else {
        state.metrics.record_request(false);
        return ActionResponse::failed(Outcome::Error, notices);
    };

    match catalog.upload(body, &name, None, &mut notices).await {
        Some(key) => {
            state.metrics.record_request(true);
            ActionResponse::ok(key, notices)
        }
        None => {
            state.metrics.record_request(false);
            ActionResponse::failed(Outcome::Error, notices)
        }
    }
}

/// POST /api/underwriting/run
async fn run_underwriting(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> ActionResponse<RunResult> {
    let timer = TimedOperation::start();
    let mut notices = Notices::new();
    let response = run(&state, request.key.trim(), &mut notices).await;

    let response = match response {
        Ok(result) => ActionResponse::ok(result, notices),
        Err(outcome) => ActionResponse::failed(outcome, notices),
    };
    if response.status != Outcome::MissingInput {
        state
            .metrics
            .record_action(Demo::Underwriting, timer.elapsed(), response.status.is_success());
    }
    response
}

async fn run(state: &AppState, key: &str, notices: &mut Notices) -> Result<RunResult, Outcome> {
    if key.is_empty() {
        notices.warning("Please select or upload an image first.");
        return Err(Outcome::MissingInput);
    }

    let config = &state.config.underwriting;
    let catalog = open_catalog(state, notices).ok_or(Outcome::Error)?;
    let artifact = catalog.artifact(key);

    // Step 1: dispatch and wait
    let runner = WorkflowRunner::new(state.underwriting.orchestrator.clone())
        .with_poll_interval(Duration::from_millis(config.poll_interval_ms));
    let output = runner
        .run(&config.state_machine_arn, &artifact, notices)
        .await
        .ok_or(Outcome::Error)?;

    // Step 2: the model answer is embedded in the workflow output
    let output = match WorkflowOutput::from_value(output) {
        Ok(output) => output,
        Err(e) => {
            notices.failure("Unexpected workflow output", e);
            return Err(Outcome::Error);
        }
    };
    let Some(DecisionRationale { decision, rationale }) = output.decision() else {
        notices.error("The workflow output contained no text response");
        return Err(Outcome::Error);
    };

    info!(key, decision = %decision, "Underwriting decision received");
    Ok(RunResult {
        key: key.to_string(),
        decision,
        rationale,
    })
}

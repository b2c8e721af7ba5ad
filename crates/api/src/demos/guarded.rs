//! Healthcare and investment dashboards: login, a guardrail chosen by the
//! user's group, guarded generation over a stored dataset, then sentiment
//! and toxicity analysis of the answer.

use auth::{AuthError, AuthState, Authenticator, Session};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use cloud::Notices;
use extract::GuardedGenerator;
use ingest::ArtifactCatalog;
use safety::{SentimentReport, ToxicityAnalyzer, ToxicityTable, analyze_sentiment};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Dashboard, Demo};
use crate::AppState;
use crate::config::GuardedDemoConfig;
use crate::error::{ActionResponse, Outcome};
use crate::metrics::TimedOperation;
use crate::sessions::SessionId;

const PAGE: &str = include_str!("../../ui/guarded.html");

pub struct GuardedDashboard {
    demo: Demo,
}

impl GuardedDashboard {
    pub fn new(demo: Demo) -> Self {
        Self { demo }
    }
}

impl Dashboard for GuardedDashboard {
    fn demo(&self) -> Demo {
        self.demo
    }

    fn body(&self) -> &'static str {
        PAGE
    }

    fn routes(&self) -> Router<AppState> {
        Router::new()
            .route("/session", get(show_session))
            .route("/login", post(login))
            .route("/password", post(set_password))
            .route("/logout", post(logout))
            .route("/ask", post(ask))
            .layer(Extension(self.demo))
    }
}

fn demo_config(state: &AppState, demo: Demo) -> &GuardedDemoConfig {
    match demo {
        Demo::Investment => &state.config.investment,
        _ => &state.config.healthcare,
    }
}

fn authenticator(state: &AppState, demo: Demo) -> Authenticator {
    Authenticator::new(
        state.clients.identity.clone(),
        demo_config(state, demo).guardrails.clone(),
    )
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub state: &'static str,
    pub username: Option<String>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            state: session.auth.name(),
            username: session.auth.username().map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct AskResult {
    pub group: String,
    pub response: String,
    pub sentiment: Option<SentimentReport>,
    pub toxicity: Option<ToxicityTable>,
}

fn auth_outcome(err: &AuthError) -> Outcome {
    match err {
        AuthError::InvalidTransition { .. } => Outcome::Conflict,
        _ => Outcome::Error,
    }
}

fn session_response(
    id: SessionId,
    session: &Session,
    outcome: Result<(), Outcome>,
    notices: Notices,
) -> Response {
    let response = match outcome {
        Ok(()) => ActionResponse::ok(SessionView::from(session), notices),
        Err(status) => ActionResponse {
            status,
            notices,
            result: Some(SessionView::from(session)),
        },
    };
    id.attach(response.into_response())
}

/// Store the outcome of an auth step unless another request with the same
/// cookie changed the session while the identity call was in flight.
fn write_back(
    state: &AppState,
    id: SessionId,
    demo: Demo,
    before: &Session,
    after: Session,
    outcome: Result<(), Outcome>,
    notices: &mut Notices,
) -> (Session, Result<(), Outcome>) {
    if state.sessions.commit(id, demo, before, after.clone()) {
        return (after, outcome);
    }
    warn!(demo = demo.slug(), "Session changed by a concurrent request; result discarded");
    notices.warning("Your session changed while this request was running. Please try again.");
    (state.sessions.load(id, demo), Err(Outcome::Conflict))
}

/// GET /api/{demo}/session
async fn show_session(
    State(state): State<AppState>,
    Extension(demo): Extension<Demo>,
    headers: HeaderMap,
) -> Response {
    let id = SessionId::from_headers(&headers);
    let session = state.sessions.load(id, demo);
    session_response(id, &session, Ok(()), Notices::new())
}

/// POST /api/{demo}/login
async fn login(
    State(state): State<AppState>,
    Extension(demo): Extension<Demo>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Response {
    let id = SessionId::from_headers(&headers);
    let before = state.sessions.load(id, demo);
    let mut session = before.clone();
    let mut notices = Notices::new();

    if request.username.trim().is_empty() || request.password.is_empty() {
        notices.warning("Please enter a username and password.");
        return session_response(id, &session, Err(Outcome::MissingInput), notices);
    }

    let outcome = match authenticator(&state, demo)
        .login(&mut session, request.username.trim(), &request.password)
        .await
    {
        Ok(()) => {
            match &session.auth {
                AuthState::Authenticated { .. } => notices.success("Login successful!"),
                _ => notices.info("A new password is required."),
            }
            Ok(())
        }
        Err(e) => {
            notices.error(e.to_string());
            Err(auth_outcome(&e))
        }
    };

    state.metrics.record_request(outcome.is_ok());
    let (session, outcome) = write_back(&state, id, demo, &before, session, outcome, &mut notices);
    session_response(id, &session, outcome, notices)
}

/// POST /api/{demo}/password
async fn set_password(
    State(state): State<AppState>,
    Extension(demo): Extension<Demo>,
    headers: HeaderMap,
    Json(request): Json<PasswordRequest>,
) -> Response {
    let id = SessionId::from_headers(&headers);
    let before = state.sessions.load(id, demo);
    let mut session = before.clone();
    let mut notices = Notices::new();

    if request.new_password.is_empty() {
        notices.warning("Please enter a new password.");
        return session_response(id, &session, Err(Outcome::MissingInput), notices);
    }

    let outcome = match authenticator(&state, demo)
        .set_new_password(&mut session, &request.new_password)
        .await
    {
        Ok(()) => {
            notices.success("Password updated successfully.");
            Ok(())
        }
        Err(e) => {
            notices.error(e.to_string());
            Err(auth_outcome(&e))
        }
    };

    state.metrics.record_request(outcome.is_ok());
    let (session, outcome) = write_back(&state, id, demo, &before, session, outcome, &mut notices);
    session_response(id, &session, outcome, notices)
}

/// POST /api/{demo}/logout
async fn logout(
    State(state): State<AppState>,
    Extension(demo): Extension<Demo>,
    headers: HeaderMap,
) -> Response {
    let id = SessionId::from_headers(&headers);
    let mut session = state.sessions.load(id, demo);
    session.logout();
    state.sessions.remove(id, demo);
    session_response(id, &session, Ok(()), Notices::new())
}

/// POST /api/{demo}/ask
async fn ask(
    State(state): State<AppState>,
    Extension(demo): Extension<Demo>,
    headers: HeaderMap,
    Json(request): Json<AskRequest>,
) -> Response {
    let timer = TimedOperation::start();
    let id = SessionId::from_headers(&headers);
    let session = state.sessions.load(id, demo);
    let mut notices = Notices::new();

    let response = match answer(&state, demo, &session, request.prompt.trim(), &mut notices).await {
        Ok(result) => ActionResponse::ok(result, notices),
        Err(outcome) => ActionResponse::failed(outcome, notices),
    };

    if !matches!(response.status, Outcome::MissingInput | Outcome::Unauthorized) {
        state
            .metrics
            .record_action(demo, timer.elapsed(), response.status.is_success());
    }
    id.attach(response.into_response())
}

async fn answer(
    state: &AppState,
    demo: Demo,
    session: &Session,
    prompt: &str,
    notices: &mut Notices,
) -> Result<AskResult, Outcome> {
    if !session.is_authenticated() {
        notices.warning("Please log in first.");
        return Err(Outcome::Unauthorized);
    }
    if prompt.is_empty() {
        notices.warning("Please enter a question for analysis.");
        return Err(Outcome::MissingInput);
    }

    let config = demo_config(state, demo);

    // Step 1: group -> guardrail
    let (group, guardrail) = match authenticator(state, demo).resolve_guardrail(session).await {
        Ok(resolved) => resolved,
        Err(e) => {
            notices.error(e.to_string());
            return Err(Outcome::Error);
        }
    };
    notices.info(format!("You are in the {} group.", group));

    // Step 2: reference dataset
    let catalog = match ArtifactCatalog::open(state.clients.buckets.as_ref(), &config.bucket) {
        Ok(catalog) => catalog,
        Err(e) => {
            notices.failure("Failed to load data from storage", e);
            return Err(Outcome::Error);
        }
    };
    let dataset = catalog
        .load_text(&config.dataset_key, notices)
        .await
        .ok_or(Outcome::Error)?;

    // Step 3: guarded generation; nothing downstream runs without an answer
    let generator = GuardedGenerator::new(
        state.clients.model.clone(),
        config.model_id.clone(),
        config.domain.clone(),
    )
    .with_max_tokens(config.max_tokens);
    let response = generator
        .generate(prompt, &dataset, &guardrail, notices)
        .await
        .ok_or(Outcome::Error)?;

    // Step 4: post-hoc analysis; failures leave the answer in place
    let sentiment = analyze_sentiment(state.clients.text.as_ref(), &response, notices).await;

    let mut analyzer = ToxicityAnalyzer::new(state.clients.text.as_ref());
    if config.all_toxicity_categories {
        analyzer = analyzer.with_all_categories();
    }
    let toxicity = analyzer.analyze(&response, notices).await;

    Ok(AskResult {
        group,
        response,
        sentiment,
        toxicity,
    })
}

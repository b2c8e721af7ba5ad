//! HTTP service hosting the responsible-AI dashboards.

pub mod config;
pub mod demos;
pub mod error;
pub mod metrics;
pub mod sessions;
pub mod ui;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use cloud::Clients;
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::sessions::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Clients in the main region
    pub clients: Clients,
    /// Clients in the underwriting workflow's region
    pub underwriting: Clients,
    pub sessions: Arc<SessionStore>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: AppConfig, clients: Clients, underwriting: Clients) -> Self {
        Self {
            config: Arc::new(config),
            clients,
            underwriting,
            sessions: Arc::new(SessionStore::new()),
            metrics: Metrics::new(),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /stats
async fn get_stats(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Pages
        .route("/", get(ui::serve_index))
        .route("/static/app.js", get(ui::serve_app_js))
        .route("/demos", get(demos::list_demos))
        .route("/demos/:slug", get(demos::show_demo))
        // Service
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        // Dashboard actions
        .merge(demos::api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

//! The four dashboards and the router page that switches between them.

pub mod classifier;
pub mod guarded;
pub mod underwriting;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::response::Html;
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;
use crate::ui;

/// Closed set of dashboards hosted by this service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Demo {
    Underwriting,
    Healthcare,
    Investment,
    MedicalClassifier,
}

impl Demo {
    pub const ALL: [Demo; 4] = [
        Demo::Underwriting,
        Demo::Healthcare,
        Demo::Investment,
        Demo::MedicalClassifier,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Demo::Underwriting => "underwriting",
            Demo::Healthcare => "healthcare",
            Demo::Investment => "investment",
            Demo::MedicalClassifier => "medical-classifier",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Demo::Underwriting => "Underwriting Auto Insurance",
            Demo::Healthcare => "Healthcare Application",
            Demo::Investment => "Investment Analysis",
            Demo::MedicalClassifier => "Medical Diagnosis Classifier",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Demo::Underwriting => 0,
            Demo::Healthcare => 1,
            Demo::Investment => 2,
            Demo::MedicalClassifier => 3,
        }
    }

    pub fn from_slug(slug: &str) -> Option<Demo> {
        Demo::ALL.into_iter().find(|d| d.slug() == slug)
    }

    pub fn dashboard(self) -> Box<dyn Dashboard> {
        match self {
            Demo::Underwriting => Box::new(underwriting::UnderwritingDashboard),
            Demo::Healthcare | Demo::Investment => Box::new(guarded::GuardedDashboard::new(self)),
            Demo::MedicalClassifier => Box::new(classifier::ClassifierDashboard),
        }
    }
}

/// What every dashboard provides to the router
pub trait Dashboard: Send + Sync {
    fn demo(&self) -> Demo;

    /// Page body, placed inside the shared layout
    fn body(&self) -> &'static str;

    /// API routes, nested under `/api/{slug}`
    fn routes(&self) -> Router<AppState>;

    fn render(&self) -> Html<String> {
        ui::render_page(self.demo().title(), Some(self.demo()), self.body())
    }
}

#[derive(Serialize)]
pub struct DemoEntry {
    pub slug: &'static str,
    pub title: &'static str,
}

/// GET /demos
pub async fn list_demos() -> Json<Vec<DemoEntry>> {
    Json(
        Demo::ALL
            .iter()
            .map(|d| DemoEntry {
                slug: d.slug(),
                title: d.title(),
            })
            .collect(),
    )
}

/// GET /demos/:slug
pub async fn show_demo(Path(slug): Path<String>) -> Result<Html<String>, ApiError> {
    let demo = Demo::from_slug(&slug).ok_or(ApiError::UnknownDemo(slug))?;
    Ok(demo.dashboard().render())
}

/// API routes of every dashboard
pub fn api_routes() -> Router<AppState> {
    Demo::ALL.iter().fold(Router::new(), |router, demo| {
        router.nest(&format!("/api/{}", demo.slug()), demo.dashboard().routes())
    })
}

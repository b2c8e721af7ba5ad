use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cloud::Notices;
use serde::Serialize;
use thiserror::Error;

/// How a dashboard action ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    /// Input checks failed before any remote call
    MissingInput,
    Unauthorized,
    /// Action not allowed in the session's current state
    Conflict,
    /// Content refused by moderation
    Rejected,
    /// A remote service failed
    Error,
}

impl Outcome {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Outcome::Ok => StatusCode::OK,
            Outcome::MissingInput => StatusCode::BAD_REQUEST,
            Outcome::Unauthorized => StatusCode::UNAUTHORIZED,
            Outcome::Conflict => StatusCode::CONFLICT,
            Outcome::Rejected => StatusCode::UNPROCESSABLE_ENTITY,
            Outcome::Error => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Ok)
    }
}

/// Body of every dashboard API response: the result, if any, and the
/// notices collected while producing it.
#[derive(Debug, Serialize)]
pub struct ActionResponse<T> {
    pub status: Outcome,
    pub notices: Notices,
    pub result: Option<T>,
}

impl<T> ActionResponse<T> {
    pub fn ok(result: T, notices: Notices) -> Self {
        Self {
            status: Outcome::Ok,
            notices,
            result: Some(result),
        }
    }

    pub fn failed(status: Outcome, notices: Notices) -> Self {
        Self {
            status,
            notices,
            result: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ActionResponse<T> {
    fn into_response(self) -> Response {
        (self.status.status_code(), Json(self)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown dashboard: {0}")]
    UnknownDemo(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::UnknownDemo(_) => StatusCode::NOT_FOUND,
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

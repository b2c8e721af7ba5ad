use thiserror::Error;

/// Failure of a single call to an external service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned {status} ({kind}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        kind: String,
        message: String,
    },

    #[error("{service} response could not be decoded: {reason}")]
    Decode {
        service: &'static str,
        reason: String,
    },

    #[error("object storage error: {0}")]
    Storage(#[from] object_store::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ServiceError {
    /// Service-side error kind (e.g. `AccessDeniedException`), if any
    pub fn kind(&self) -> Option<&str> {
        match self {
            ServiceError::Api { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

use cloud::ServiceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{action} is not allowed while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Unsupported authentication challenge: {0}")]
    UnsupportedChallenge(String),

    #[error("Failed to retrieve user group.")]
    NoGroup,

    #[error("No guardrail found for the {0} group.")]
    NoGuardrail(String),

    #[error("{context}: {source}")]
    Service {
        context: &'static str,
        #[source]
        source: ServiceError,
    },
}

impl AuthError {
    pub(crate) fn service(context: &'static str) -> impl FnOnce(ServiceError) -> Self {
        move |source| AuthError::Service { context, source }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

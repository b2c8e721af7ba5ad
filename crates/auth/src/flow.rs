use cloud::identity::NEW_PASSWORD_REQUIRED;
use cloud::{AuthOutcome, GuardrailRef, IdentityProvider};
use std::sync::Arc;
use tracing::info;

use crate::error::{AuthError, AuthResult};
use crate::policy::GuardrailPolicies;
use crate::session::{AuthState, Session};

/// Drives a [`Session`] through login, forced password reset and group
/// lookup.
#[derive(Clone)]
pub struct Authenticator {
    identity: Arc<dyn IdentityProvider>,
    policies: GuardrailPolicies,
}

impl Authenticator {
    pub fn new(identity: Arc<dyn IdentityProvider>, policies: GuardrailPolicies) -> Self {
        Self { identity, policies }
    }

    /// `Unauthenticated` -> `Authenticated` or `PasswordResetRequired`.
    /// On error the session is unchanged.
    pub async fn login(&self, session: &mut Session, username: &str, password: &str) -> AuthResult<()> {
        if session.auth != AuthState::Unauthenticated {
            return Err(AuthError::InvalidTransition {
                action: "login",
                state: session.auth.name(),
            });
        }

        let outcome = self
            .identity
            .authenticate(username, password)
            .await
            .map_err(AuthError::service("Authentication failed"))?;

        session.auth = match outcome {
            AuthOutcome::Authenticated => {
                info!(username, "Login successful");
                AuthState::Authenticated {
                    username: username.to_string(),
                }
            }
            AuthOutcome::Challenge { name, session: challenge } if name == NEW_PASSWORD_REQUIRED => {
                info!(username, "New password required");
                AuthState::PasswordResetRequired {
                    username: username.to_string(),
                    challenge,
                }
            }
            AuthOutcome::Challenge { name, .. } => return Err(AuthError::UnsupportedChallenge(name)),
        };
        Ok(())
    }

    /// `PasswordResetRequired` -> `Authenticated`. On error the session is
    /// unchanged and the operator can retry.
    pub async fn set_new_password(&self, session: &mut Session, new_password: &str) -> AuthResult<()> {
        let AuthState::PasswordResetRequired { username, challenge } = &session.auth else {
            return Err(AuthError::InvalidTransition {
                action: "set_new_password",
                state: session.auth.name(),
            });
        };

        let outcome = self
            .identity
            .respond_to_new_password(challenge, username, new_password)
            .await
            .map_err(AuthError::service("Failed to update password"))?;

        match outcome {
            AuthOutcome::Authenticated => {
                let username = username.clone();
                info!(username = %username, "Password updated");
                session.auth = AuthState::Authenticated { username };
                Ok(())
            }
            AuthOutcome::Challenge { name, .. } => Err(AuthError::UnsupportedChallenge(name)),
        }
    }

    /// First group of the signed-in user and its guardrail
    pub async fn resolve_guardrail(&self, session: &Session) -> AuthResult<(String, GuardrailRef)> {
        let AuthState::Authenticated { username } = &session.auth else {
            return Err(AuthError::InvalidTransition {
                action: "resolve_guardrail",
                state: session.auth.name(),
            });
        };

        let groups = self
            .identity
            .list_groups(username)
            .await
            .map_err(AuthError::service("Failed to get user group"))?;

        let group = groups.into_iter().next().ok_or(AuthError::NoGroup)?;
        let guardrail = self
            .policies
            .for_group(&group)
            .ok_or_else(|| AuthError::NoGuardrail(group.clone()))?;

        Ok((group, guardrail))
    }
}

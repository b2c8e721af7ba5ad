use serde::Serialize;

/// Where a session is in the login flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthState {
    #[default]
    Unauthenticated,
    PasswordResetRequired {
        username: String,
        #[serde(skip)]
        challenge: String,
    },
    Authenticated {
        username: String,
    },
}

impl AuthState {
    pub fn name(&self) -> &'static str {
        match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::PasswordResetRequired { .. } => "password_reset_required",
            AuthState::Authenticated { .. } => "authenticated",
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            AuthState::Unauthenticated => None,
            AuthState::PasswordResetRequired { username, .. }
            | AuthState::Authenticated { username } => Some(username),
        }
    }
}

/// Per-operator state of one guarded dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    pub auth: AuthState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated { .. })
    }

    /// Always lands in `Unauthenticated`
    pub fn logout(&mut self) {
        if let Some(username) = self.auth.username() {
            tracing::info!(username, "Logged out");
        }
        self.auth = AuthState::Unauthenticated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logout_from_every_state() {
        let states = [
            AuthState::Unauthenticated,
            AuthState::PasswordResetRequired {
                username: "nurse1".to_string(),
                challenge: "session".to_string(),
            },
            AuthState::Authenticated {
                username: "doc".to_string(),
            },
        ];
        for state in states {
            let mut session = Session { auth: state };
            session.logout();
            assert_eq!(session.auth, AuthState::Unauthenticated);
        }
    }

    #[test]
    fn test_challenge_session_not_serialized() {
        let state = AuthState::PasswordResetRequired {
            username: "nurse1".to_string(),
            challenge: "secret-session".to_string(),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("password_reset_required"));
        assert!(!json.contains("secret-session"));
    }
}

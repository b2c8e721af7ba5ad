use auth::{AuthState, Session};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::demos::Demo;

pub const SESSION_COOKIE: &str = "dashboard_session";

/// Login state per browser and dashboard. Each entry is only read or written
/// by requests carrying its cookie.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<(Uuid, Demo), Session>,
}

/// Session id of one request, and whether the browser still needs the cookie
#[derive(Debug, Clone, Copy)]
pub struct SessionId {
    pub id: Uuid,
    pub fresh: bool,
}

impl SessionId {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match cookie_value(headers, SESSION_COOKIE).and_then(|v| Uuid::parse_str(v).ok()) {
            Some(id) => Self { id, fresh: false },
            None => Self {
                id: Uuid::new_v4(),
                fresh: true,
            },
        }
    }

    /// Attach `Set-Cookie` when the id was just minted
    pub fn attach(&self, mut response: Response) -> Response {
        if self.fresh {
            let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Strict", SESSION_COOKIE, self.id);
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }
        response
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the session; unknown ids start unauthenticated
    pub fn load(&self, id: SessionId, demo: Demo) -> Session {
        self.sessions
            .get(&(id.id, demo))
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Write back `after` if the stored session still equals `before`, the
    /// copy the request started from. Unauthenticated sessions are not kept.
    /// Returns false when a concurrent request changed the session first.
    pub fn commit(&self, id: SessionId, demo: Demo, before: &Session, after: Session) -> bool {
        let keep = after.auth != AuthState::Unauthenticated;
        match self.sessions.entry((id.id, demo)) {
            Entry::Occupied(mut entry) => {
                if entry.get() != before {
                    return false;
                }
                if keep {
                    entry.insert(after);
                } else {
                    entry.remove();
                }
            }
            Entry::Vacant(entry) => {
                if *before != Session::default() {
                    return false;
                }
                if keep {
                    entry.insert(after);
                }
            }
        }
        true
    }

    pub fn remove(&self, id: SessionId, demo: Demo) {
        self.sessions.remove(&(id.id, demo));
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_parsing() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}", SESSION_COOKIE, id)).unwrap(),
        );

        let session_id = SessionId::from_headers(&headers);
        assert_eq!(session_id.id, id);
        assert!(!session_id.fresh);
    }

    #[test]
    fn test_missing_or_garbage_cookie_mints_new_id() {
        assert!(SessionId::from_headers(&HeaderMap::new()).fresh);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("dashboard_session=not-a-uuid"));
        assert!(SessionId::from_headers(&headers).fresh);
    }

    #[test]
    fn test_sessions_isolated_per_demo() {
        let store = SessionStore::new();
        let id = SessionId::from_headers(&HeaderMap::new());

        let before = store.load(id, Demo::Healthcare);
        assert!(store.commit(id, Demo::Healthcare, &before, authenticated("doc")));

        assert!(store.load(id, Demo::Healthcare).is_authenticated());
        assert!(!store.load(id, Demo::Investment).is_authenticated());
    }

    fn authenticated(username: &str) -> Session {
        Session {
            auth: AuthState::Authenticated {
                username: username.to_string(),
            },
        }
    }

    #[test]
    fn test_unauthenticated_sessions_are_not_kept() {
        let store = SessionStore::new();
        for _ in 0..50 {
            let id = SessionId::from_headers(&HeaderMap::new());
            assert!(store.commit(id, Demo::Healthcare, &Session::new(), Session::new()));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_logout_clears_entry() {
        let store = SessionStore::new();
        let id = SessionId::from_headers(&HeaderMap::new());
        store.commit(id, Demo::Investment, &Session::new(), authenticated("analyst"));
        assert_eq!(store.len(), 1);

        let mut session = store.load(id, Demo::Investment);
        let before = session.clone();
        session.logout();
        assert!(store.commit(id, Demo::Investment, &before, session));
        assert!(store.is_empty());

        store.commit(id, Demo::Investment, &Session::new(), authenticated("analyst"));
        store.remove(id, Demo::Investment);
        assert!(store.is_empty());
    }

    #[test]
    fn test_stale_write_back_is_dropped() {
        let store = SessionStore::new();
        let id = SessionId::from_headers(&HeaderMap::new());
        let reset = Session {
            auth: AuthState::PasswordResetRequired {
                username: "nurse".to_string(),
                challenge: "c1".to_string(),
            },
        };
        store.commit(id, Demo::Healthcare, &Session::new(), reset.clone());

        // A password change starts from `reset`; a logout lands before it finishes
        store.remove(id, Demo::Healthcare);

        assert!(!store.commit(id, Demo::Healthcare, &reset, authenticated("nurse")));
        assert!(!store.load(id, Demo::Healthcare).is_authenticated());
        assert!(store.is_empty());
    }
}

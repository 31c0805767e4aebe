use crate::errors::AccessError;
use crate::time;

/// Authenticated identity held by the front end for one browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    /// Opaque token issued by the auth service
    pub token: String,
    pub established_at: u64,
}

impl Session {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
            established_at: time::now_millis(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated(Session),
}

impl SessionState {
    /// Only a session carrying a non-empty token counts as authenticated.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(session) if !session.token.is_empty())
    }

    /// Gate for catalog entry points.
    pub fn require(&self) -> Result<&Session, AccessError> {
        match self {
            SessionState::Authenticated(session) if !session.token.is_empty() => Ok(session),
            _ => Err(AccessError::Unauthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unauthenticated() {
        let state = SessionState::default();
        assert!(!state.is_authenticated());
        assert!(matches!(state.require(), Err(AccessError::Unauthenticated)));
    }

    #[test]
    fn authenticated_state_exposes_session() {
        let state = SessionState::Authenticated(Session::new("alice", "tok-1"));
        let session = state.require().expect("authenticated");
        assert_eq!(session.username, "alice");
        assert_eq!(session.token, "tok-1");
    }

    #[test]
    fn empty_token_is_not_authenticated() {
        let state = SessionState::Authenticated(Session::new("alice", ""));
        assert!(!state.is_authenticated());
        assert!(state.require().is_err());
    }
}

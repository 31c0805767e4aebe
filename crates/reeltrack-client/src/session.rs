//! Browser-session bookkeeping on top of the auth and clock services.
//!
//! Each browser session is identified by an opaque id handed to the browser
//! after a successful login. An id with no entry here is Unauthenticated.

use std::collections::HashMap;

use parking_lot::RwLock;
use reeltrack_core::{AccessError, Session, SessionState, TimeFormat};
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthClient, LoginReply, RegisterReply};
use crate::clock::ClockClient;
use crate::error::ServiceResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated {
        session_id: Uuid,
        session: Session,
        welcome: String,
    },
    /// The auth service (or local validation) refused the credentials.
    Rejected { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered { message: String },
    Rejected { message: String },
}

pub struct SessionManager {
    auth: AuthClient,
    clock: ClockClient,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionManager {
    pub fn new(auth: AuthClient, clock: ClockClient) -> Self {
        Self {
            auth,
            clock,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Authenticates against the auth service. On success a new session id
    /// replaces `current`; on rejection the existing state is left untouched.
    pub async fn login(
        &self,
        current: Option<Uuid>,
        username: &str,
        password: &str,
        format: TimeFormat,
    ) -> ServiceResult<LoginOutcome> {
        if username.trim().is_empty() || password.is_empty() {
            return Ok(LoginOutcome::Rejected {
                message: "Username and password are required".to_string(),
            });
        }

        let token = match self.auth.login(username, password).await? {
            LoginReply::Accepted { token, .. } => token,
            LoginReply::Rejected { message } => return Ok(LoginOutcome::Rejected { message }),
        };

        let session = Session::new(username, token);
        let session_id = Uuid::new_v4();
        {
            let mut sessions = self.sessions.write();
            if let Some(previous) = current {
                sessions.remove(&previous);
            }
            sessions.insert(session_id, session.clone());
        }
        info!(username, %session_id, "session established");

        let time = self.clock.time_or_placeholder(format).await;
        let welcome = if time.is_empty() {
            format!("Welcome, {username}!")
        } else {
            format!("Welcome, {username}! Logged in at {time}.")
        };

        Ok(LoginOutcome::Authenticated {
            session_id,
            session,
            welcome,
        })
    }

    /// Registers a new account. The confirmation is checked here so a
    /// mismatch never reaches the auth service.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> ServiceResult<RegisterOutcome> {
        if username.trim().is_empty() || password.is_empty() {
            return Ok(RegisterOutcome::Rejected {
                message: "Username and password are required".to_string(),
            });
        }
        if password != confirm_password {
            return Ok(RegisterOutcome::Rejected {
                message: "Passwords do not match".to_string(),
            });
        }

        Ok(match self.auth.register(username, password).await? {
            RegisterReply::Registered { message } => RegisterOutcome::Registered {
                message: message.unwrap_or_else(|| "Registration successful".to_string()),
            },
            RegisterReply::Rejected { message } => RegisterOutcome::Rejected { message },
        })
    }

    pub fn state(&self, session_id: Option<Uuid>) -> SessionState {
        session_id
            .and_then(|id| self.sessions.read().get(&id).cloned())
            .map(SessionState::Authenticated)
            .unwrap_or_default()
    }

    /// Access gate for catalog entry points.
    pub fn require(&self, session_id: Option<Uuid>) -> Result<Session, AccessError> {
        self.state(session_id).require().cloned()
    }

    /// Returns whether a session was actually ended.
    pub fn logout(&self, session_id: Uuid) -> bool {
        let removed = self.sessions.write().remove(&session_id);
        if let Some(session) = &removed {
            info!(username = %session.username, %session_id, "session ended");
        }
        removed.is_some()
    }

    /// Ends every session, e.g. on shutdown.
    pub fn clear_all(&self) -> usize {
        let mut sessions = self.sessions.write();
        let cleared = sessions.len();
        sessions.clear();
        cleared
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.read().len()
    }
}

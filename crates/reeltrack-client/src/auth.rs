use std::sync::Arc;

use reeltrack_core::protocol::{AuthReply, AuthRequest};
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::transport::{exchange, Retry, Transport};

/// Result of a `login` round trip that reached the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginReply {
    Accepted { token: String, message: Option<String> },
    Rejected { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterReply {
    Registered { message: Option<String> },
    Rejected { message: String },
}

#[derive(Clone)]
pub struct AuthClient {
    transport: Arc<dyn Transport>,
}

impl AuthClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Never retried: the service may have created a session already.
    pub async fn login(&self, username: &str, password: &str) -> ServiceResult<LoginReply> {
        let request = AuthRequest::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        let reply: AuthReply = exchange(self.transport.as_ref(), &request, Retry::Never).await?;

        if !reply.status.is_ok() {
            warn!(username, "login rejected");
            return Ok(LoginReply::Rejected {
                message: reply
                    .message
                    .unwrap_or_else(|| "Invalid username or password".to_string()),
            });
        }

        match reply.session_id {
            Some(token) if !token.is_empty() => {
                info!(username, "login accepted");
                Ok(LoginReply::Accepted {
                    token,
                    message: reply.message,
                })
            }
            _ => Err(ServiceError::protocol(
                self.transport.endpoint().role,
                "login succeeded without a session_id",
            )),
        }
    }

    /// The caller has already checked the password confirmation.
    pub async fn register(&self, username: &str, password: &str) -> ServiceResult<RegisterReply> {
        let request = AuthRequest::Register {
            username: username.to_string(),
            password: password.to_string(),
        };
        let reply: AuthReply = exchange(self.transport.as_ref(), &request, Retry::Never).await?;

        if reply.status.is_ok() {
            info!(username, "registration accepted");
            Ok(RegisterReply::Registered {
                message: reply.message,
            })
        } else {
            Ok(RegisterReply::Rejected {
                message: reply
                    .message
                    .unwrap_or_else(|| "Registration failed".to_string()),
            })
        }
    }
}

use reeltrack_core::ServiceRole;
use thiserror::Error;

/// Failure of one round trip to a backend service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Connection refused, closed, or no reply within the time budget.
    #[error("{role} service unavailable: {reason}")]
    Unavailable { role: ServiceRole, reason: String },

    /// The reply was absent, not JSON, or missing required fields.
    #[error("malformed reply from {role} service: {detail}")]
    Protocol { role: ServiceRole, detail: String },

    /// Well-formed `status: error` reply.
    #[error("{role} service reported an error: {message}")]
    Remote { role: ServiceRole, message: String },
}

impl ServiceError {
    pub fn role(&self) -> ServiceRole {
        match self {
            ServiceError::Unavailable { role, .. }
            | ServiceError::Protocol { role, .. }
            | ServiceError::Remote { role, .. } => *role,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ServiceError::Unavailable { .. })
    }

    pub(crate) fn unavailable(role: ServiceRole, reason: impl Into<String>) -> Self {
        ServiceError::Unavailable {
            role,
            reason: reason.into(),
        }
    }

    pub(crate) fn protocol(role: ServiceRole, detail: impl Into<String>) -> Self {
        ServiceError::Protocol {
            role,
            detail: detail.into(),
        }
    }

    pub(crate) fn remote(role: ServiceRole, message: Option<String>) -> Self {
        ServiceError::Remote {
            role,
            message: message.unwrap_or_else(|| "no message".to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

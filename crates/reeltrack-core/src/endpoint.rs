use std::fmt;

use serde::{Deserialize, Serialize};

/// The four backend services the front end delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRole {
    Auth,
    Calendar,
    Clock,
    Counter,
}

impl ServiceRole {
    pub const ALL: [ServiceRole; 4] = [
        ServiceRole::Auth,
        ServiceRole::Calendar,
        ServiceRole::Clock,
        ServiceRole::Counter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceRole::Auth => "auth",
            ServiceRole::Calendar => "calendar",
            ServiceRole::Clock => "clock",
            ServiceRole::Counter => "counter",
        }
    }

    /// Address used when nothing else is configured.
    pub fn default_address(&self) -> &'static str {
        match self {
            ServiceRole::Auth => "127.0.0.1:5555",
            ServiceRole::Calendar => "127.0.0.1:5556",
            ServiceRole::Clock => "127.0.0.1:5557",
            ServiceRole::Counter => "127.0.0.1:5558",
        }
    }
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed peer address for one service, valid for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub role: ServiceRole,
    /// `host:port` of the peer
    pub address: String,
}

impl ServiceEndpoint {
    pub fn new(role: ServiceRole, address: impl Into<String>) -> Self {
        Self {
            role,
            address: address.into(),
        }
    }

    pub fn default_for(role: ServiceRole) -> Self {
        Self::new(role, role.default_address())
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.role, self.address)
    }
}

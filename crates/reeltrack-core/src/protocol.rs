//! Wire messages exchanged with the backend services.
//!
//! Every channel carries one JSON document per line: the front end sends a
//! request object and reads back exactly one reply before sending again.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Name of the counter that mirrors the catalog size.
pub const TOTAL_ITEMS: &str = "total_items";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
    Error,
}

impl ReplyStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, ReplyStatus::Ok)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuthRequest {
    Login { username: String, password: String },
    Register { username: String, password: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthReply {
    pub status: ReplyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AuthReply {
    pub fn ok(session_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Ok,
            session_id,
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error,
            session_id: None,
            message: Some(message.into()),
        }
    }
}

/// Display format understood by the clock service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum TimeFormat {
    #[serde(rename = "12")]
    H12,
    #[default]
    #[serde(rename = "24")]
    H24,
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeFormat::H12 => f.write_str("12"),
            TimeFormat::H24 => f.write_str("24"),
        }
    }
}

impl FromStr for TimeFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "12" => Ok(TimeFormat::H12),
            "24" => Ok(TimeFormat::H24),
            other => Err(format!("time format must be \"12\" or \"24\", got {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClockRequest {
    GetTime { format: TimeFormat },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockReply {
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRequest {
    pub format: String,
}

/// The calendar service answers with a bare string; a `{"date": ...}`
/// mapping is accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CalendarReply {
    Bare(String),
    Mapped { date: String },
}

impl CalendarReply {
    pub fn into_date(self) -> String {
        match self {
            CalendarReply::Bare(date) | CalendarReply::Mapped { date } => date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CounterRequest {
    /// Add one to the counter; the service calls this action `counter`.
    #[serde(rename = "counter")]
    Increment { counter_name: String },
    Get { counter_name: String },
    Reset { counter_name: String },
    /// Absolute update, avoids replaying increments.
    Set { counter_name: String, value: u64 },
}

impl CounterRequest {
    pub fn counter_name(&self) -> &str {
        match self {
            CounterRequest::Increment { counter_name }
            | CounterRequest::Get { counter_name }
            | CounterRequest::Reset { counter_name }
            | CounterRequest::Set { counter_name, .. } => counter_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterReply {
    pub status: ReplyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CounterReply {
    pub fn ok(count: Option<u64>) -> Self {
        Self {
            status: ReplyStatus::Ok,
            count,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error,
            count: None,
            message: Some(message.into()),
        }
    }
}

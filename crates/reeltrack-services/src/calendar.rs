use std::fmt::Write;

use chrono::Local;
use reeltrack_core::protocol::CalendarRequest;
use serde_json::Value;

use crate::server::{error_reply, Responder};

/// Replies with the current local date as a bare string.
pub struct CalendarService;

impl CalendarService {
    /// `None` when `format` is not a valid strftime pattern.
    pub fn today(format: &str) -> Option<String> {
        let mut out = String::new();
        write!(out, "{}", Local::now().format(format)).ok()?;
        Some(out)
    }
}

impl Responder for CalendarService {
    fn name(&self) -> &'static str {
        "calendar"
    }

    fn respond(&self, request: Value) -> Value {
        let request = match serde_json::from_value::<CalendarRequest>(request) {
            Ok(request) => request,
            Err(err) => return error_reply(format!("invalid calendar request: {err}")),
        };
        match Self::today(&request.format) {
            Some(date) => Value::String(date),
            None => error_reply(format!("invalid date format: {}", request.format)),
        }
    }
}

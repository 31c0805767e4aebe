use chrono::Local;
use reeltrack_core::protocol::{ClockReply, ClockRequest};
use reeltrack_core::TimeFormat;
use serde_json::Value;

use crate::server::{error_reply, Responder};

pub struct ClockService;

impl ClockService {
    pub fn pattern(format: TimeFormat) -> &'static str {
        match format {
            TimeFormat::H12 => "%I:%M %p",
            TimeFormat::H24 => "%H:%M",
        }
    }

    pub fn now(format: TimeFormat) -> String {
        Local::now().format(Self::pattern(format)).to_string()
    }
}

impl Responder for ClockService {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn respond(&self, request: Value) -> Value {
        match serde_json::from_value::<ClockRequest>(request) {
            Ok(ClockRequest::GetTime { format }) => serde_json::to_value(ClockReply {
                time: Self::now(format),
            })
            .unwrap_or_else(|_| error_reply("internal error")),
            Err(err) => error_reply(format!("invalid clock request: {err}")),
        }
    }
}

use std::collections::HashMap;

use parking_lot::Mutex;
use reeltrack_core::protocol::{CounterReply, CounterRequest};
use serde_json::Value;
use tracing::debug;

use crate::server::{error_reply, Responder};

/// Named integer registers. Unknown names read as zero.
#[derive(Default)]
pub struct CounterService {
    counters: Mutex<HashMap<String, u64>>,
}

impl CounterService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, request: CounterRequest) -> CounterReply {
        let mut counters = self.counters.lock();
        let reply = match &request {
            CounterRequest::Increment { counter_name } => {
                let value = counters.entry(counter_name.clone()).or_insert(0);
                *value += 1;
                CounterReply::ok(Some(*value))
            }
            CounterRequest::Get { counter_name } => {
                CounterReply::ok(Some(counters.get(counter_name).copied().unwrap_or(0)))
            }
            CounterRequest::Reset { counter_name } => {
                counters.insert(counter_name.clone(), 0);
                CounterReply::ok(None)
            }
            CounterRequest::Set { counter_name, value } => {
                counters.insert(counter_name.clone(), *value);
                CounterReply::ok(Some(*value))
            }
        };
        debug!(counter = request.counter_name(), count = ?reply.count, "counter request applied");
        reply
    }
}

impl Responder for CounterService {
    fn name(&self) -> &'static str {
        "counter"
    }

    fn respond(&self, request: Value) -> Value {
        match serde_json::from_value::<CounterRequest>(request) {
            Ok(request) => serde_json::to_value(self.apply(request))
                .unwrap_or_else(|_| error_reply("internal error")),
            Err(err) => error_reply(format!("invalid counter request: {err}")),
        }
    }
}

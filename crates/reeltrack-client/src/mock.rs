use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reeltrack_core::{ServiceEndpoint, ServiceRole};
use serde_json::Value;

use crate::error::ServiceResult;
use crate::transport::Transport;

type Handler = Box<dyn FnMut(&Value) -> ServiceResult<Value> + Send>;

/// In-memory peer that answers with a closure and records every request.
pub(crate) struct ScriptedTransport {
    endpoint: ServiceEndpoint,
    handler: Mutex<Handler>,
    requests: Mutex<Vec<Value>>,
}

impl ScriptedTransport {
    pub(crate) fn new(
        role: ServiceRole,
        handler: impl FnMut(&Value) -> ServiceResult<Value> + Send + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            endpoint: ServiceEndpoint::default_for(role),
            handler: Mutex::new(Box::new(handler)),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<Value> {
        self.requests.lock().clone()
    }

    /// `action` fields of every recorded request, in order.
    pub(crate) fn actions(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter_map(|req| req.get("action").and_then(Value::as_str).map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    async fn call(&self, request: Value) -> ServiceResult<Value> {
        self.requests.lock().push(request.clone());
        let mut handler = self.handler.lock();
        (*handler)(&request)
    }
}

use std::sync::Arc;

use reeltrack_core::protocol::{CounterReply, CounterRequest};
use reeltrack_core::ServiceRole;

use crate::error::{ServiceError, ServiceResult};
use crate::transport::{exchange, Retry, Transport};

/// Client for the named-counter service.
///
/// Only [`CounterClient::get`] is retried. `increment`, `reset` and `set` may
/// already have been applied when a reply is lost, so repeating them blindly
/// could double-count.
#[derive(Clone)]
pub struct CounterClient {
    transport: Arc<dyn Transport>,
}

impl CounterClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn increment(&self, counter_name: &str) -> ServiceResult<u64> {
        let reply = self
            .send(
                CounterRequest::Increment {
                    counter_name: counter_name.to_string(),
                },
                Retry::Never,
            )
            .await?;
        self.require_count(reply)
    }

    pub async fn get(&self, counter_name: &str) -> ServiceResult<u64> {
        let reply = self
            .send(
                CounterRequest::Get {
                    counter_name: counter_name.to_string(),
                },
                Retry::Once,
            )
            .await?;
        self.require_count(reply)
    }

    pub async fn reset(&self, counter_name: &str) -> ServiceResult<()> {
        self.send(
            CounterRequest::Reset {
                counter_name: counter_name.to_string(),
            },
            Retry::Never,
        )
        .await?;
        Ok(())
    }

    /// Absolute update. Peers without `set` answer with `status: error`.
    pub async fn set(&self, counter_name: &str, value: u64) -> ServiceResult<u64> {
        let reply = self
            .send(
                CounterRequest::Set {
                    counter_name: counter_name.to_string(),
                    value,
                },
                Retry::Never,
            )
            .await?;
        self.require_count(reply)
    }

    async fn send(&self, request: CounterRequest, retry: Retry) -> ServiceResult<CounterReply> {
        let reply: CounterReply = exchange(self.transport.as_ref(), &request, retry).await?;
        if reply.status.is_ok() {
            Ok(reply)
        } else {
            Err(ServiceError::remote(ServiceRole::Counter, reply.message))
        }
    }

    fn require_count(&self, reply: CounterReply) -> ServiceResult<u64> {
        reply
            .count
            .ok_or_else(|| ServiceError::protocol(ServiceRole::Counter, "reply has no count"))
    }
}

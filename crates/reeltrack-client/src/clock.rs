use std::sync::Arc;

use reeltrack_core::protocol::{ClockReply, ClockRequest};
use reeltrack_core::TimeFormat;
use tracing::warn;

use crate::error::ServiceResult;
use crate::transport::{exchange, Retry, Transport};

#[derive(Clone)]
pub struct ClockClient {
    transport: Arc<dyn Transport>,
}

impl ClockClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn get_time(&self, format: TimeFormat) -> ServiceResult<String> {
        let reply: ClockReply = exchange(
            self.transport.as_ref(),
            &ClockRequest::GetTime { format },
            Retry::Once,
        )
        .await?;
        Ok(reply.time)
    }

    /// Display-only lookup: any failure yields an empty string.
    pub async fn time_or_placeholder(&self, format: TimeFormat) -> String {
        match self.get_time(format).await {
            Ok(time) => time,
            Err(err) => {
                warn!(error = %err, "clock lookup failed, continuing without time");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::mock::ScriptedTransport;
    use reeltrack_core::ServiceRole;
    use serde_json::json;

    #[tokio::test]
    async fn returns_time_field() {
        let transport = ScriptedTransport::new(ServiceRole::Clock, |_| Ok(json!({"time": "03:04 PM"})));
        let clock = ClockClient::new(transport.clone());
        assert_eq!(clock.get_time(TimeFormat::H12).await.expect("time"), "03:04 PM");
        assert_eq!(
            transport.requests(),
            vec![json!({"action": "get_time", "format": "12"})]
        );
    }

    #[tokio::test]
    async fn unavailable_read_is_retried_once() {
        let mut calls = 0;
        let transport = ScriptedTransport::new(ServiceRole::Clock, move |_| {
            calls += 1;
            if calls == 1 {
                Err(ServiceError::unavailable(ServiceRole::Clock, "reset by peer"))
            } else {
                Ok(json!({"time": "15:04"}))
            }
        });
        let clock = ClockClient::new(transport.clone());
        assert_eq!(clock.get_time(TimeFormat::H24).await.expect("time"), "15:04");
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn malformed_reply_degrades_to_placeholder() {
        let transport = ScriptedTransport::new(ServiceRole::Clock, |_| Ok(json!({"status": "error"})));
        let clock = ClockClient::new(transport.clone());
        assert_eq!(clock.time_or_placeholder(TimeFormat::H24).await, "");
        // protocol errors are not retried
        assert_eq!(transport.requests().len(), 1);
    }
}

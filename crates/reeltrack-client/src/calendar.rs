use std::sync::Arc;

use reeltrack_core::protocol::{CalendarReply, CalendarRequest};
use tracing::warn;

use crate::error::ServiceResult;
use crate::transport::{exchange, Retry, Transport};

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct CalendarClient {
    transport: Arc<dyn Transport>,
}

impl CalendarClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn get_date(&self, format: &str) -> ServiceResult<String> {
        let request = CalendarRequest {
            format: format.to_string(),
        };
        let reply: CalendarReply = exchange(self.transport.as_ref(), &request, Retry::Once).await?;
        Ok(reply.into_date())
    }

    /// Used when stamping new items; a missing date never blocks the add.
    pub async fn date_or_placeholder(&self, format: &str) -> String {
        match self.get_date(format).await {
            Ok(date) => date,
            Err(err) => {
                warn!(error = %err, "calendar lookup failed, recording empty date");
                String::new()
            }
        }
    }
}

//! Command-line and environment configuration shared by the binaries.

use std::time::Duration;

use clap::Args;
use reeltrack_core::protocol::TOTAL_ITEMS;
use reeltrack_core::{ServiceEndpoint, ServiceRole};

use crate::calendar::DEFAULT_DATE_FORMAT;
use crate::coordinator::{CoordinatorConfig, SyncStrategy};
use crate::hub::HubConfig;

/// Addresses of the four backend services.
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// Auth service address
    #[arg(long, env = "REELTRACK_AUTH_ADDR", default_value = "127.0.0.1:5555")]
    pub auth_addr: String,

    /// Calendar service address
    #[arg(long, env = "REELTRACK_CALENDAR_ADDR", default_value = "127.0.0.1:5556")]
    pub calendar_addr: String,

    /// Clock service address
    #[arg(long, env = "REELTRACK_CLOCK_ADDR", default_value = "127.0.0.1:5557")]
    pub clock_addr: String,

    /// Counter service address
    #[arg(long, env = "REELTRACK_COUNTER_ADDR", default_value = "127.0.0.1:5558")]
    pub counter_addr: String,

    /// Time budget for one round trip, in milliseconds
    #[arg(long, env = "REELTRACK_SERVICE_TIMEOUT_MS", default_value_t = 2000)]
    pub service_timeout_ms: u64,
}

impl ServiceArgs {
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            auth: ServiceEndpoint::new(ServiceRole::Auth, &self.auth_addr),
            calendar: ServiceEndpoint::new(ServiceRole::Calendar, &self.calendar_addr),
            clock: ServiceEndpoint::new(ServiceRole::Clock, &self.clock_addr),
            counter: ServiceEndpoint::new(ServiceRole::Counter, &self.counter_addr),
            timeout: Duration::from_millis(self.service_timeout_ms),
        }
    }
}

/// Counter synchronization settings.
#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Remote counter that mirrors the catalog size
    #[arg(long, env = "REELTRACK_COUNTER_NAME", default_value = TOTAL_ITEMS)]
    pub counter_name: String,

    /// How removals resynchronize the counter: replay | absolute
    #[arg(long, env = "REELTRACK_SYNC_STRATEGY", default_value = "replay")]
    pub sync_strategy: SyncStrategy,

    /// Format sent to the calendar service when stamping new items
    #[arg(long, env = "REELTRACK_DATE_FORMAT", default_value = DEFAULT_DATE_FORMAT)]
    pub date_format: String,
}

impl SyncArgs {
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            counter_name: self.counter_name.clone(),
            strategy: self.sync_strategy,
            date_format: self.date_format.clone(),
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use reeltrack_core::{ServiceEndpoint, ServiceRole};
use tracing::{info, warn};

use crate::auth::AuthClient;
use crate::calendar::CalendarClient;
use crate::clock::ClockClient;
use crate::counter::CounterClient;
use crate::transport::{TcpTransport, DEFAULT_CALL_TIMEOUT};

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub auth: ServiceEndpoint,
    pub calendar: ServiceEndpoint,
    pub clock: ServiceEndpoint,
    pub counter: ServiceEndpoint,
    pub timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            auth: ServiceEndpoint::default_for(ServiceRole::Auth),
            calendar: ServiceEndpoint::default_for(ServiceRole::Calendar),
            clock: ServiceEndpoint::default_for(ServiceRole::Clock),
            counter: ServiceEndpoint::default_for(ServiceRole::Counter),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Owns one connection per backend service between [`ServiceHub::start`] and
/// [`ServiceHub::shutdown`]. Handlers receive the hub (or its clients)
/// explicitly instead of reaching for process globals.
pub struct ServiceHub {
    transports: Vec<Arc<TcpTransport>>,
    auth: AuthClient,
    calendar: CalendarClient,
    clock: ClockClient,
    counter: CounterClient,
}

impl ServiceHub {
    /// Builds the clients without dialing any peer.
    pub fn new(config: HubConfig) -> Self {
        let auth = Arc::new(TcpTransport::new(config.auth, config.timeout));
        let calendar = Arc::new(TcpTransport::new(config.calendar, config.timeout));
        let clock = Arc::new(TcpTransport::new(config.clock, config.timeout));
        let counter = Arc::new(TcpTransport::new(config.counter, config.timeout));

        Self {
            auth: AuthClient::new(auth.clone()),
            calendar: CalendarClient::new(calendar.clone()),
            clock: ClockClient::new(clock.clone()),
            counter: CounterClient::new(counter.clone()),
            transports: vec![auth, calendar, clock, counter],
        }
    }

    /// Builds the clients and opens every connection. Peers that are down are
    /// logged and dialed again on first use.
    pub async fn start(config: HubConfig) -> Self {
        let hub = Self::new(config);
        let connected = hub.connect_all().await;
        info!(connected, total = hub.transports.len(), "service hub started");
        hub
    }

    pub async fn connect_all(&self) -> usize {
        let mut connected = 0;
        for transport in &self.transports {
            match transport.connect().await {
                Ok(()) => connected += 1,
                Err(err) => warn!(role = %transport.role(), error = %err, "service not reachable at startup"),
            }
        }
        connected
    }

    /// Closes every connection. Clients stay usable and will reconnect.
    pub async fn shutdown(&self) {
        for transport in &self.transports {
            transport.close().await;
        }
        info!("service hub shut down");
    }

    pub async fn connected_roles(&self) -> Vec<ServiceRole> {
        let mut roles = Vec::new();
        for transport in &self.transports {
            if transport.is_connected().await {
                roles.push(transport.role());
            }
        }
        roles
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    pub fn calendar(&self) -> &CalendarClient {
        &self.calendar
    }

    pub fn clock(&self) -> &ClockClient {
        &self.clock
    }

    pub fn counter(&self) -> &CounterClient {
        &self.counter
    }
}

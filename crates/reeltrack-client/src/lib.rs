//! Request/reply clients for the ReelTrack backend services, the browser
//! session manager built on them, and the coordinator that keeps the remote
//! item counter in step with the catalog.

pub mod error;
pub mod transport;
pub mod auth;
pub mod clock;
pub mod calendar;
pub mod counter;
pub mod hub;
pub mod session;
pub mod coordinator;
pub mod config;

#[cfg(test)]
mod mock;

pub use error::{ServiceError, ServiceResult};
pub use transport::{TcpTransport, Transport, DEFAULT_CALL_TIMEOUT};
pub use auth::{AuthClient, LoginReply, RegisterReply};
pub use clock::ClockClient;
pub use calendar::CalendarClient;
pub use counter::CounterClient;
pub use hub::{HubConfig, ServiceHub};
pub use session::{LoginOutcome, RegisterOutcome, SessionManager};
pub use coordinator::{
    CatalogCoordinator, CoordinatorConfig, CoordinatorError, CounterStatus, CounterSync, Mutation,
    SyncStrategy,
};
pub use config::{ServiceArgs, SyncArgs};

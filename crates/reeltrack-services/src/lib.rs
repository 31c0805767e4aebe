//! Reference implementations of the four backend services. Each one speaks
//! line-delimited JSON request/reply over TCP.

pub mod server;
pub mod auth;
pub mod clock;
pub mod calendar;
pub mod counter;

pub use server::{spawn, Responder};
pub use auth::AuthService;
pub use clock::ClockService;
pub use calendar::CalendarService;
pub use counter::CounterService;

pub mod item;
pub mod endpoint;
pub mod protocol;
pub mod session;
pub mod catalog;
pub mod errors;
pub mod time;
pub mod auth;

pub use item::{CatalogItem, ItemStatus, NewItem};
pub use endpoint::{ServiceEndpoint, ServiceRole};
pub use protocol::{ReplyStatus, TimeFormat};
pub use session::{Session, SessionState};
pub use catalog::{CatalogStore, MemoryCatalog};
pub use errors::{AccessError, CatalogError};
pub use auth::Claims;

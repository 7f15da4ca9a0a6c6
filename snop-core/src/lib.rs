pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod session;

pub use backend::{BackendClient, RELAY_PREFIX, UPSTREAM_PREFIX};
pub use config::SnopConfig;
pub use error::{RelayError, SnopError};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};

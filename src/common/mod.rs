//! Common utilities and types shared across the application.

pub mod chatlog;
pub mod error;
pub mod messages;
pub mod reconnect;
pub mod session;

pub use chatlog::ChatLog;
pub use messages::{RelayKind, RelayedMessage};
pub use session::ConnectionState;

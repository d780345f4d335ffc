//! Discord side of the bridge.
//!
//! This module connects to one guild with serenity and relays message and
//! reaction lifecycle events for the bridged channels.

pub mod client;
pub mod endpoint;
pub mod events;
pub mod gateway;
pub mod handler;
pub mod resolver;
pub mod tracker;

// Re-export main types for external use
pub use endpoint::DiscordEndpoint;
pub use events::GuildEvent;
pub use gateway::{GuildGateway, HttpGateway};

//! Grid (virtual world) side of the bridge.

pub mod client;
pub mod endpoint;

pub use client::{GridClient, GroupChatEvent};
pub use endpoint::GridEndpoint;

//! Relay core shared by both platforms.
//!
//! ## Module Structure
//!
//! - `endpoint`: the `Endpoint` trait and the destination back-reference
//! - `filter`: self/ignored sender filtering
//! - `formatter`: display strings for relayed messages
//! - `orchestrator`: endpoint pairing, startup sequencing and reconnects
//! - `topics`: positional topic mapping

pub mod endpoint;
pub mod filter;
pub mod formatter;
pub mod orchestrator;
pub mod topics;

pub use endpoint::{Destination, Endpoint, EndpointKind};
pub use filter::SenderFilter;
pub use orchestrator::Relay;
pub use topics::TopicIndex;

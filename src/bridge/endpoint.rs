//! The chat endpoint capability.
//!
//! Both platforms implement [`Endpoint`]. Each endpoint knows its paired
//! destination only through a weak back-reference; the orchestrator owns both.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::common::error::EndpointResult;
use crate::common::{ChatLog, RelayedMessage};

/// Which platform an endpoint talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Grid,
    Discord,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointKind::Grid => write!(f, "Grid"),
            EndpointKind::Discord => write!(f, "Discord"),
        }
    }
}

/// One side of the bridge.
#[async_trait]
pub trait Endpoint: Send + Sync {
    fn kind(&self) -> EndpointKind;

    /// Number of configured topics.
    fn topic_count(&self) -> usize;

    /// True after a full connect + listen cycle, false after disconnect or failure.
    fn is_connected(&self) -> bool;

    /// Establish the platform session. Safe to call again after a disconnect.
    async fn connect(&self) -> EndpointResult<()>;

    /// Subscribe to inbound events. Requires a successful `connect`.
    async fn listen(&self) -> EndpointResult<()>;

    /// Dispatch text to the topic at `topic`.
    ///
    /// Out-of-range topics and blank text are dropped. Returns immediately;
    /// delivery happens on a detached task.
    fn send(&self, topic: usize, text: &str);

    /// Tear down the session. Failures are logged, never returned.
    async fn disconnect(&self);

    /// Record the paired endpoint that inbound events are relayed to.
    fn set_destination(&self, destination: Weak<dyn Endpoint>);
}

/// Weak link to the paired endpoint.
#[derive(Default)]
pub struct Destination {
    inner: RwLock<Option<Weak<dyn Endpoint>>>,
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.get().map(|d| d.kind());
        f.debug_struct("Destination").field("kind", &kind).finish()
    }
}

impl Destination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, destination: Weak<dyn Endpoint>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(destination);
    }

    /// Upgrade the link, if the destination is set and still alive.
    pub fn get(&self) -> Option<Arc<dyn Endpoint>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }

    /// Render a message and hand it to the destination's `send`.
    pub fn relay(&self, source: EndpointKind, message: RelayedMessage) {
        let Some(text) = message.render() else {
            debug!("{}: empty {:?} message from {} suppressed", source, message.kind, message.sender);
            return;
        };

        match self.get() {
            Some(destination) => {
                debug!("{} -> {} [{}]", source, destination.kind(), message.topic);
                destination.send(message.topic, &text);
            }
            None => warn!("{}: no destination set, dropping message", source),
        }
    }
}

/// Shared `send` validation and bookkeeping.
///
/// Returns `true` when the text should be dispatched; invalid input is logged
/// at debug level and rejected.
pub fn accept_send(
    kind: EndpointKind,
    topic: usize,
    topic_count: usize,
    text: &str,
    chat_log: Option<&ChatLog>,
) -> bool {
    if topic >= topic_count || text.trim().is_empty() {
        debug!("{}: invalid send -- {}, '{}'", kind, topic, text);
        return false;
    }

    info!("{} <- [{}]: {}", kind, topic, text);
    if let Some(log) = chat_log {
        log.append(text);
    }
    true
}

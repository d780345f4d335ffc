//! Grid client abstraction.
//!
//! The virtual-world protocol itself lives outside this crate: embedders wrap
//! their grid SDK in a [`GridClient`] and hand it to the runtime.

use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::common::error::GridResult;
use crate::config::GridCredentials;

/// An incoming group chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupChatEvent {
    /// Group (session) the message was posted in.
    pub group_id: Uuid,
    /// Sending agent.
    pub from_id: Uuid,
    /// Sender's display name.
    pub from_name: String,
    pub message: String,
}

/// Operations the bridge needs from a grid SDK.
#[async_trait]
pub trait GridClient: Send + Sync {
    /// Authenticate with the login service.
    async fn login(&self, credentials: &GridCredentials) -> GridResult<()>;

    /// Establish the simulator (region) session.
    async fn connect_to_sim(&self) -> GridResult<()>;

    /// Resolve once the event queue is up and delivering.
    async fn wait_for_event_queue(&self) -> GridResult<()>;

    /// Own agent id, available after login.
    fn agent_id(&self) -> Option<Uuid>;

    /// Subscribe to incoming group chat. The stream ends when the session dies.
    fn group_chat_events(&self) -> GridResult<BoxStream<'static, GroupChatEvent>>;

    /// Open the per-group chat session required before messages flow.
    async fn start_group_chat_session(&self, group_id: Uuid) -> GridResult<()>;

    async fn send_group_message(&self, group_id: Uuid, message: &str) -> GridResult<()>;

    /// Log out and drop the session.
    async fn close(&self) -> GridResult<()>;
}

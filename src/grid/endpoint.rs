//! Grid group chat endpoint.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bridge::endpoint::{accept_send, Destination, Endpoint, EndpointKind};
use crate::bridge::filter::SenderFilter;
use crate::bridge::topics::TopicIndex;
use crate::common::error::{EndpointResult, GridError};
use crate::common::{ChatLog, ConnectionState, RelayedMessage};
use crate::config::{GridConfig, GridCredentials};
use crate::grid::client::{GridClient, GroupChatEvent};

/// State shared with the inbound listener task.
struct GridShared {
    client: Arc<dyn GridClient>,
    groups: TopicIndex<Uuid>,
    filter: SenderFilter<Uuid>,
    destination: Destination,
    connection: Arc<ConnectionState>,
}

impl GridShared {
    fn handle_group_chat(&self, event: &GroupChatEvent, own_id: Uuid) {
        if let Err(reason) = self.filter.check(&event.from_id, Some(&own_id)) {
            debug!("Grid: dropping message from {} ({})", event.from_name, reason);
            return;
        }

        let Some(topic) = self.groups.index_of(&event.group_id) else {
            debug!("Grid: message in unmonitored group {}", event.group_id);
            return;
        };

        debug!("Grid [{}] {}: {}", topic, event.from_name, event.message);
        self.destination.relay(
            EndpointKind::Grid,
            RelayedMessage::normal(event.from_name.as_str(), event.message.as_str(), topic),
        );
    }
}

/// Endpoint for the grid side of the bridge.
pub struct GridEndpoint {
    shared: Arc<GridShared>,
    credentials: GridCredentials,
    chat_log: Option<Arc<ChatLog>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl GridEndpoint {
    pub fn new(client: Arc<dyn GridClient>, config: &GridConfig, chat_log: Option<Arc<ChatLog>>) -> Self {
        Self {
            shared: Arc::new(GridShared {
                client,
                groups: TopicIndex::new(config.groups.clone()),
                filter: SenderFilter::new(config.ignore.iter().copied()),
                destination: Destination::new(),
                connection: Arc::new(ConnectionState::new()),
            }),
            credentials: config.credentials(),
            chat_log,
            listener: Mutex::new(None),
        }
    }

    /// Stop the listener and invalidate the current session.
    ///
    /// Returns true if a session had been started.
    fn stop_listener(&self) -> bool {
        self.shared.connection.invalidate();

        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    async fn join_group_sessions(&self) {
        for (position, group) in self.shared.groups.iter().enumerate() {
            match self.shared.client.start_group_chat_session(*group).await {
                Ok(()) => info!("Joined group chat session {} [{}]", group, position),
                Err(e) => warn!("Failed to join group chat session {} [{}]: {}", group, position, e),
            }
        }
    }
}

#[async_trait]
impl Endpoint for GridEndpoint {
    fn kind(&self) -> EndpointKind {
        EndpointKind::Grid
    }

    fn topic_count(&self) -> usize {
        self.shared.groups.len()
    }

    fn is_connected(&self) -> bool {
        self.shared.connection.is_connected()
    }

    async fn connect(&self) -> EndpointResult<()> {
        if self.stop_listener() {
            debug!("Grid: closing previous session before reconnecting");
            if let Err(e) = self.shared.client.close().await {
                debug!("Grid: closing previous session failed: {}", e);
            }
        }

        info!(
            "Logging in to grid as {} {}",
            self.credentials.first_name, self.credentials.last_name
        );
        self.shared.client.login(&self.credentials).await?;
        self.shared.client.connect_to_sim().await?;
        self.shared.client.wait_for_event_queue().await?;
        info!("Grid event queue ready");
        Ok(())
    }

    async fn listen(&self) -> EndpointResult<()> {
        let own_id = self.shared.client.agent_id().ok_or(GridError::NotLoggedIn)?;
        let mut events = self.shared.client.group_chat_events()?;

        // A listener replaced below must not clear the flag of this one.
        self.shared.connection.invalidate();
        let shared = self.shared.clone();
        let guard = shared.connection.guard("Grid event listener");
        let handle = tokio::spawn(async move {
            let _guard = guard;
            while let Some(event) = events.next().await {
                shared.handle_group_chat(&event, own_id);
            }
        });
        if let Some(previous) = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle)
        {
            previous.abort();
        }

        self.join_group_sessions().await;
        self.shared.connection.mark_connected();
        Ok(())
    }

    fn send(&self, topic: usize, text: &str) {
        if !accept_send(EndpointKind::Grid, topic, self.topic_count(), text, self.chat_log.as_deref()) {
            return;
        }
        let Some(group) = self.shared.groups.get(topic).copied() else {
            return;
        };

        let client = self.shared.client.clone();
        let text = text.to_string();
        tokio::spawn(async move {
            if let Err(e) = client.send_group_message(group, &text).await {
                warn!("Failed to send to group {}: {}", group, e);
            }
        });
    }

    async fn disconnect(&self) {
        self.stop_listener();
        match self.shared.client.close().await {
            Ok(()) => info!("Disconnected from grid"),
            Err(e) => warn!("Grid disconnect failed: {}", e),
        }
    }

    fn set_destination(&self, destination: Weak<dyn Endpoint>) {
        self.shared.destination.set(destination);
    }
}

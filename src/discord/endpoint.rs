//! Discord guild endpoint.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use serenity::gateway::ShardManager;
use serenity::model::id::{ChannelId, GuildId, UserId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bridge::endpoint::{accept_send, Endpoint, EndpointKind};
use crate::common::error::{DiscordError, EndpointError, EndpointResult};
use crate::common::{ChatLog, ConnectionState};
use crate::config::DiscordConfig;
use crate::discord::client::build_client;
use crate::discord::events::GuildEvent;
use crate::discord::gateway::{GuildGateway, HttpGateway};
use crate::discord::handler::{GuildRelay, GuildSession};
use crate::discord::resolver::MentionResolver;
use crate::discord::tracker::RecentMessages;

/// Live connection state, replaced on every connect.
#[derive(Default)]
struct SessionState {
    session: Option<Arc<GuildSession>>,
    /// Events buffered between connect and listen.
    events_rx: Option<mpsc::UnboundedReceiver<GuildEvent>>,
    shard_manager: Option<Arc<ShardManager>>,
    tasks: Vec<JoinHandle<()>>,
}

/// Endpoint for the Discord side of the bridge.
pub struct DiscordEndpoint {
    token: String,
    guild_id: GuildId,
    relay: Arc<GuildRelay>,
    resolver: Arc<MentionResolver>,
    chat_log: Option<Arc<ChatLog>>,
    connection: Arc<ConnectionState>,
    state: Mutex<SessionState>,
}

impl DiscordEndpoint {
    pub fn new(config: &DiscordConfig, chat_log: Option<Arc<ChatLog>>) -> Self {
        Self {
            token: config.token.clone(),
            guild_id: config.guild_id,
            relay: Arc::new(GuildRelay::new(
                config.channels.clone(),
                config.ignore.clone(),
                RecentMessages::default(),
            )),
            resolver: Arc::new(MentionResolver::new()),
            chat_log,
            connection: Arc::new(ConnectionState::new()),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Channel ids in pairing order.
    pub fn channels(&self) -> Vec<ChannelId> {
        self.relay.channels().iter().copied().collect()
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Invalidate the current session and stop its tasks.
    async fn teardown(&self) {
        self.connection.invalidate();

        let previous = std::mem::take(&mut *self.state());
        if let Some(shard_manager) = previous.shard_manager {
            info!("Initiating graceful Discord shutdown...");
            shard_manager.shutdown_all().await;
        }
        for task in previous.tasks {
            task.abort();
        }
    }

    /// Verify the configured guild and every channel, in pairing order.
    async fn verify_guild(&self, http: &serenity::http::Http) -> Result<UserId, DiscordError> {
        let current_user = http.get_current_user().await?;

        let guild = self.guild_id.to_partial_guild(http).await?;
        info!("Discord guild: {}", guild.name);

        for (position, channel_id) in self.relay.channels().iter().enumerate() {
            let channel = channel_id.to_channel(http).await?;
            match channel.guild() {
                Some(channel) if channel.guild_id == self.guild_id => {
                    info!("Bridging #{} [{}]", channel.name, position);
                }
                _ => {
                    return Err(DiscordError::ChannelNotInGuild {
                        channel_id: channel_id.get(),
                        guild_id: self.guild_id.get(),
                    })
                }
            }
        }

        Ok(current_user.id)
    }

    /// Install a session without a live gateway.
    #[cfg(test)]
    pub(crate) fn attach_session(
        &self,
        gateway: Arc<dyn GuildGateway>,
        own_id: UserId,
    ) -> mpsc::UnboundedSender<GuildEvent> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut state = self.state();
        state.session = Some(Arc::new(GuildSession { gateway, own_id }));
        state.events_rx = Some(events_rx);
        events_tx
    }
}

#[async_trait]
impl Endpoint for DiscordEndpoint {
    fn kind(&self) -> EndpointKind {
        EndpointKind::Discord
    }

    fn topic_count(&self) -> usize {
        self.relay.channels().len()
    }

    fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    async fn connect(&self) -> EndpointResult<()> {
        self.teardown().await;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut client = build_client(&self.token, self.guild_id, events_tx)
            .await
            .map_err(|e| DiscordError::ConnectionFailed {
                message: e.to_string(),
            })?;

        let http = client.http.clone();
        let own_id = self.verify_guild(&http).await?;

        let shard_manager = client.shard_manager.clone();
        let guard = self.connection.guard("Discord gateway");
        let gateway_task = tokio::spawn(async move {
            let _guard = guard;
            match client.start().await {
                Ok(()) => info!("Discord client disconnected normally"),
                Err(e) => error!("Discord client error: {}", e),
            }
        });

        let mut state = self.state();
        state.session = Some(Arc::new(GuildSession {
            gateway: Arc::new(HttpGateway::new(http, self.guild_id)),
            own_id,
        }));
        state.events_rx = Some(events_rx);
        state.shard_manager = Some(shard_manager);
        state.tasks.push(gateway_task);
        Ok(())
    }

    async fn listen(&self) -> EndpointResult<()> {
        let (session, mut events_rx) = {
            let mut state = self.state();
            match (state.session.clone(), state.events_rx.take()) {
                (Some(session), Some(events_rx)) => (session, events_rx),
                _ => {
                    return Err(EndpointError::NotConnected {
                        endpoint: EndpointKind::Discord.to_string(),
                    })
                }
            }
        };

        let relay = self.relay.clone();
        let guard = self.connection.guard("Discord event consumer");
        let consumer = tokio::spawn(async move {
            let _guard = guard;
            while let Some(event) = events_rx.recv().await {
                relay.dispatch(&session, event);
            }
        });
        self.state().tasks.push(consumer);

        self.connection.mark_connected();
        Ok(())
    }

    fn send(&self, topic: usize, text: &str) {
        if !accept_send(EndpointKind::Discord, topic, self.topic_count(), text, self.chat_log.as_deref()) {
            return;
        }
        let Some(channel_id) = self.relay.channels().get(topic).copied() else {
            return;
        };
        let Some(session) = self.state().session.clone() else {
            debug!("Dropping message for [{}] - Discord not connected", topic);
            return;
        };

        let resolver = self.resolver.clone();
        let text = text.to_string();
        tokio::spawn(async move {
            let text = resolver.process_mentions(session.gateway.as_ref(), &text).await;
            if let Err(e) = session.gateway.send_message(channel_id, &text).await {
                warn!("Failed to send to channel {}: {}", channel_id, e);
            }
        });
    }

    async fn disconnect(&self) {
        self.teardown().await;
        info!("Disconnected from Discord");
    }

    fn set_destination(&self, destination: Weak<dyn Endpoint>) {
        self.relay.destination().set(destination);
    }
}

//! Serenity client construction and gateway event translation.
//!
//! The serenity [`EventHandler`] only converts payloads into [`GuildEvent`]s
//! and pushes them into a channel; all relay logic runs on the consumer side.

use std::time::Duration;

use serenity::async_trait;
use serenity::http::HttpBuilder;
use serenity::model::channel::{Message, Reaction};
use serenity::model::event::MessageUpdateEvent;
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::discord::events::{emoji_label, GuildEvent, MessageSnapshot};

/// Gateway intents needed for message and reaction lifecycle events.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::MESSAGE_CONTENT
}

/// Forwards gateway events for one guild into an mpsc channel.
struct GuildEvents {
    guild_id: GuildId,
    events_tx: mpsc::UnboundedSender<GuildEvent>,
}

impl GuildEvents {
    fn new(guild_id: GuildId, events_tx: mpsc::UnboundedSender<GuildEvent>) -> Self {
        Self { guild_id, events_tx }
    }

    fn forward(&self, guild_id: Option<GuildId>, event: GuildEvent) {
        if guild_id != Some(self.guild_id) {
            return;
        }
        if let Err(error) = self.events_tx.send(event) {
            warn!("Failed to process discord event: {}", error);
        }
    }

    fn reaction_event(reaction: &Reaction, make: fn(ChannelId, MessageId, String) -> GuildEvent) -> GuildEvent {
        make(reaction.channel_id, reaction.message_id, emoji_label(&reaction.emoji))
    }
}

#[async_trait]
impl EventHandler for GuildEvents {
    async fn ready(&self, _context: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);
    }

    async fn message(&self, _context: Context, message: Message) {
        self.forward(message.guild_id, GuildEvent::Created(MessageSnapshot::from(&message)));
    }

    async fn message_update(
        &self,
        _context: Context,
        _old: Option<Message>,
        _new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        self.forward(
            event.guild_id,
            GuildEvent::Updated {
                channel_id: event.channel_id,
                message_id: event.id,
                author_id: event.author.as_ref().map(|author| author.id),
                content: event.content,
            },
        );
    }

    async fn message_delete(
        &self,
        _context: Context,
        channel_id: ChannelId,
        message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        self.forward(guild_id, GuildEvent::Deleted { channel_id, message_id });
    }

    async fn message_delete_bulk(
        &self,
        _context: Context,
        channel_id: ChannelId,
        message_ids: Vec<MessageId>,
        guild_id: Option<GuildId>,
    ) {
        self.forward(guild_id, GuildEvent::DeletedBulk { channel_id, message_ids });
    }

    async fn reaction_add(&self, _context: Context, reaction: Reaction) {
        let event = Self::reaction_event(&reaction, |channel_id, message_id, emoji| {
            GuildEvent::ReactionAdded {
                channel_id,
                message_id,
                emoji,
            }
        });
        self.forward(reaction.guild_id, event);
    }

    async fn reaction_remove(&self, _context: Context, reaction: Reaction) {
        let event = Self::reaction_event(&reaction, |channel_id, message_id, emoji| {
            GuildEvent::ReactionRemoved {
                channel_id,
                message_id,
                emoji,
            }
        });
        self.forward(reaction.guild_id, event);
    }

    async fn reaction_remove_emoji(&self, _context: Context, reaction: Reaction) {
        let event = Self::reaction_event(&reaction, |channel_id, message_id, emoji| {
            GuildEvent::ReactionEmojiRemoved {
                channel_id,
                message_id,
                emoji,
            }
        });
        self.forward(reaction.guild_id, event);
    }

    async fn reaction_remove_all(&self, _context: Context, channel_id: ChannelId, message_id: MessageId) {
        // No guild id in this payload; unbridged channels are dropped downstream.
        debug!("Reactions cleared on {} in {}", message_id, channel_id);
        self.forward(Some(self.guild_id), GuildEvent::ReactionsRemovedAll { channel_id, message_id });
    }
}

/// Build a serenity client whose gateway events land in `events_tx`.
pub async fn build_client(
    token: &str,
    guild_id: GuildId,
    events_tx: mpsc::UnboundedSender<GuildEvent>,
) -> anyhow::Result<Client> {
    // Build a custom reqwest client with timeout settings
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let http = HttpBuilder::new(token).client(reqwest_client).build();

    let events = GuildEvents::new(guild_id, events_tx);
    let client = serenity::client::ClientBuilder::new_with_http(http, intents())
        .event_handler(events)
        .await?;
    Ok(client)
}

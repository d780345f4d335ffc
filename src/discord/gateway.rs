//! Guild REST operations used while relaying.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};

use crate::common::error::DiscordResult;
use crate::discord::events::{emoji_label, MessageSnapshot};
use crate::discord::tracker::TrackedMessage;

/// Guild lookups and channel sends.
#[async_trait]
pub trait GuildGateway: Send + Sync {
    /// Display name of a guild member.
    async fn display_name(&self, user_id: UserId) -> DiscordResult<String>;

    /// Members whose name matches `query`, at most `limit`.
    async fn search_members(&self, query: &str, limit: u64) -> DiscordResult<Vec<UserId>>;

    /// Fetch a message that is still present, with its reactions.
    async fn fetch_message(&self, channel_id: ChannelId, message_id: MessageId) -> DiscordResult<TrackedMessage>;

    async fn send_message(&self, channel_id: ChannelId, text: &str) -> DiscordResult<()>;
}

/// [`GuildGateway`] over serenity's HTTP client.
pub struct HttpGateway {
    http: Arc<Http>,
    guild_id: GuildId,
}

impl HttpGateway {
    pub fn new(http: Arc<Http>, guild_id: GuildId) -> Self {
        Self { http, guild_id }
    }
}

#[async_trait]
impl GuildGateway for HttpGateway {
    async fn display_name(&self, user_id: UserId) -> DiscordResult<String> {
        let member = self.guild_id.member(&self.http, user_id).await?;
        Ok(member.display_name().to_string())
    }

    async fn search_members(&self, query: &str, limit: u64) -> DiscordResult<Vec<UserId>> {
        let members = self
            .guild_id
            .search_members(&self.http, query, Some(limit))
            .await?;
        Ok(members.into_iter().map(|member| member.user.id).collect())
    }

    async fn fetch_message(&self, channel_id: ChannelId, message_id: MessageId) -> DiscordResult<TrackedMessage> {
        let message = channel_id.message(&self.http, message_id).await?;
        Ok(TrackedMessage {
            message: MessageSnapshot::from(&message),
            reactions: message
                .reactions
                .iter()
                .map(|reaction| (emoji_label(&reaction.reaction_type), reaction.count))
                .collect(),
        })
    }

    async fn send_message(&self, channel_id: ChannelId, text: &str) -> DiscordResult<()> {
        channel_id.say(&self.http, text).await?;
        Ok(())
    }
}

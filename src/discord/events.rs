//! Domain view of the guild gateway events the bridge reacts to.
//!
//! The serenity event handler converts gateway payloads into [`GuildEvent`]s
//! so the relay logic never touches serenity's context types.

use serenity::model::channel::{Message, ReactionType};
use serenity::model::id::{ChannelId, MessageId, UserId};

/// The parts of a Discord message the bridge needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSnapshot {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub content: String,
}

impl From<&Message> for MessageSnapshot {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            channel_id: message.channel_id,
            author_id: message.author.id,
            content: message.content.clone(),
        }
    }
}

/// Message and reaction lifecycle events for the configured guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildEvent {
    Created(MessageSnapshot),
    Updated {
        channel_id: ChannelId,
        message_id: MessageId,
        author_id: Option<UserId>,
        /// New content; `None` when the update did not touch the text.
        content: Option<String>,
    },
    Deleted {
        channel_id: ChannelId,
        message_id: MessageId,
    },
    DeletedBulk {
        channel_id: ChannelId,
        message_ids: Vec<MessageId>,
    },
    ReactionAdded {
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: String,
    },
    ReactionRemoved {
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: String,
    },
    ReactionsRemovedAll {
        channel_id: ChannelId,
        message_id: MessageId,
    },
    ReactionEmojiRemoved {
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: String,
    },
}

impl GuildEvent {
    pub fn channel_id(&self) -> ChannelId {
        match self {
            GuildEvent::Created(message) => message.channel_id,
            GuildEvent::Updated { channel_id, .. }
            | GuildEvent::Deleted { channel_id, .. }
            | GuildEvent::DeletedBulk { channel_id, .. }
            | GuildEvent::ReactionAdded { channel_id, .. }
            | GuildEvent::ReactionRemoved { channel_id, .. }
            | GuildEvent::ReactionsRemovedAll { channel_id, .. }
            | GuildEvent::ReactionEmojiRemoved { channel_id, .. } => *channel_id,
        }
    }
}

/// Text label for a reaction, without surrounding colons.
///
/// Unicode emojis are kept as the character itself; custom emojis use their name.
pub fn emoji_label(reaction: &ReactionType) -> String {
    match reaction {
        ReactionType::Unicode(unicode) => unicode.clone(),
        ReactionType::Custom { name, id, .. } => name.clone().unwrap_or_else(|| id.to_string()),
        _ => reaction.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::model::id::EmojiId;

    #[test]
    fn test_unicode_label_is_the_emoji() {
        assert_eq!(emoji_label(&ReactionType::Unicode("👍".to_string())), "👍");
        assert_eq!(emoji_label(&ReactionType::Unicode("😄".to_string())), "😄");
    }

    #[test]
    fn test_custom_label_uses_name() {
        let custom = ReactionType::Custom {
            animated: false,
            id: EmojiId::new(42),
            name: Some("partyparrot".to_string()),
        };
        assert_eq!(emoji_label(&custom), "partyparrot");

        let unnamed = ReactionType::Custom {
            animated: false,
            id: EmojiId::new(42),
            name: None,
        };
        assert_eq!(emoji_label(&unnamed), "42");
    }

    #[test]
    fn test_event_channel_id() {
        let event = GuildEvent::DeletedBulk {
            channel_id: ChannelId::new(9),
            message_ids: vec![MessageId::new(1)],
        };
        assert_eq!(event.channel_id(), ChannelId::new(9));
    }
}

//! Discord event relay.
//!
//! Bookkeeping against the recent-message tracker happens in event order on
//! the consumer task; the asynchronous tail of each relay (member lookup,
//! message fetch) then runs as its own task, so completions may interleave.

use std::sync::{Arc, Mutex, PoisonError};

use serenity::model::id::{ChannelId, MessageId, UserId};
use tracing::debug;

use crate::bridge::endpoint::{Destination, EndpointKind};
use crate::bridge::filter::SenderFilter;
use crate::bridge::topics::TopicIndex;
use crate::common::RelayedMessage;
use crate::discord::events::{GuildEvent, MessageSnapshot};
use crate::discord::gateway::GuildGateway;
use crate::discord::tracker::{RecentMessages, TrackedMessage};

/// Per-connection handles needed while relaying.
pub struct GuildSession {
    pub gateway: Arc<dyn GuildGateway>,
    /// The bot's own user id.
    pub own_id: UserId,
}

/// What to relay once the sender's display name is known.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RelayBody {
    Normal(String),
    Edited { old: String, new: String },
    Deleted(String),
    ReactionAdded { emoji: String, text: String },
    ReactionRemoved { emoji: String, text: String },
}

impl RelayBody {
    fn into_message(self, sender: String, topic: usize) -> RelayedMessage {
        match self {
            RelayBody::Normal(text) => RelayedMessage::normal(sender, text, topic),
            RelayBody::Edited { old, new } => RelayedMessage::edited(sender, &old, &new, topic),
            RelayBody::Deleted(text) => RelayedMessage::deleted(sender, text, topic),
            RelayBody::ReactionAdded { emoji, text } => {
                RelayedMessage::reaction_added(sender, &emoji, &text, topic)
            }
            RelayBody::ReactionRemoved { emoji, text } => {
                RelayedMessage::reaction_removed(sender, &emoji, &text, topic)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingRelay {
    author_id: UserId,
    topic: usize,
    body: RelayBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Job {
    Relay(PendingRelay),
    /// Reaction on a message the tracker has not seen.
    FetchReaction {
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: String,
        added: bool,
    },
}

/// Relays guild events to the paired endpoint.
pub struct GuildRelay {
    channels: TopicIndex<ChannelId>,
    filter: SenderFilter<UserId>,
    destination: Destination,
    tracker: Mutex<RecentMessages>,
}

impl GuildRelay {
    pub fn new(channels: Vec<ChannelId>, ignore: Vec<UserId>, tracker: RecentMessages) -> Self {
        Self {
            channels: TopicIndex::new(channels),
            filter: SenderFilter::new(ignore),
            destination: Destination::new(),
            tracker: Mutex::new(tracker),
        }
    }

    pub fn channels(&self) -> &TopicIndex<ChannelId> {
        &self.channels
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Handle one gateway event. Each resulting relay runs on its own task.
    pub fn dispatch(self: &Arc<Self>, session: &Arc<GuildSession>, event: GuildEvent) {
        for job in self.prepare(session, event) {
            let relay = self.clone();
            let session = session.clone();
            tokio::spawn(async move { relay.run(&session, job).await });
        }
    }

    /// Drop messages authored by the bot or by an ignored user.
    fn valid_message(&self, session: &GuildSession, author_id: UserId) -> bool {
        match self.filter.check(&author_id, Some(&session.own_id)) {
            Ok(()) => true,
            Err(reason) => {
                debug!("Invalid message - {}", reason);
                false
            }
        }
    }

    fn topic_of(&self, channel_id: ChannelId) -> Option<usize> {
        let topic = self.channels.index_of(&channel_id);
        if topic.is_none() {
            debug!("Discord: channel {} is not bridged", channel_id);
        }
        topic
    }

    fn tracker(&self) -> std::sync::MutexGuard<'_, RecentMessages> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self, session: &GuildSession, message: &MessageSnapshot, body: RelayBody) -> Option<Job> {
        if !self.valid_message(session, message.author_id) {
            return None;
        }
        let topic = self.topic_of(message.channel_id)?;
        Some(Job::Relay(PendingRelay {
            author_id: message.author_id,
            topic,
            body,
        }))
    }

    fn prepare(&self, session: &GuildSession, event: GuildEvent) -> Vec<Job> {
        match event {
            GuildEvent::Created(message) => {
                if self.topic_of(message.channel_id).is_none() {
                    return Vec::new();
                }
                self.tracker().insert(TrackedMessage::new(message.clone()));
                let body = RelayBody::Normal(message.content.clone());
                self.pending(session, &message, body).into_iter().collect()
            }
            GuildEvent::Updated {
                message_id,
                author_id,
                content,
                ..
            } => {
                let Some(new) = content else {
                    debug!("Discord: update of {} without content", message_id);
                    return Vec::new();
                };
                let (old, mut message) = {
                    let mut tracker = self.tracker();
                    let Some(old) = tracker.update_content(message_id, &new) else {
                        debug!("Discord: edit of untracked message {}", message_id);
                        return Vec::new();
                    };
                    let Some(tracked) = tracker.get(message_id) else {
                        return Vec::new();
                    };
                    (old, tracked.message.clone())
                };
                if old == new {
                    return Vec::new();
                }
                if let Some(author_id) = author_id {
                    message.author_id = author_id;
                }
                self.pending(session, &message, RelayBody::Edited { old, new })
                    .into_iter()
                    .collect()
            }
            GuildEvent::Deleted { message_id, .. } => self.prepare_deleted(session, message_id).into_iter().collect(),
            GuildEvent::DeletedBulk { message_ids, .. } => message_ids
                .into_iter()
                .filter_map(|message_id| self.prepare_deleted(session, message_id))
                .collect(),
            GuildEvent::ReactionAdded {
                channel_id,
                message_id,
                emoji,
            } => {
                let tracked = {
                    let mut tracker = self.tracker();
                    tracker.add_reaction(message_id, &emoji);
                    tracker.get(message_id).map(|t| t.message.clone())
                };
                self.prepare_reaction(session, channel_id, message_id, tracked, emoji, true)
            }
            GuildEvent::ReactionRemoved {
                channel_id,
                message_id,
                emoji,
            } => {
                let tracked = {
                    let mut tracker = self.tracker();
                    tracker.remove_reaction(message_id, &emoji);
                    tracker.get(message_id).map(|t| t.message.clone())
                };
                self.prepare_reaction(session, channel_id, message_id, tracked, emoji, false)
            }
            GuildEvent::ReactionEmojiRemoved {
                channel_id,
                message_id,
                emoji,
            } => {
                let tracked = {
                    let mut tracker = self.tracker();
                    tracker.clear_emoji(message_id, &emoji);
                    tracker.get(message_id).map(|t| t.message.clone())
                };
                self.prepare_reaction(session, channel_id, message_id, tracked, emoji, false)
            }
            GuildEvent::ReactionsRemovedAll { message_id, .. } => {
                let (message, emojis) = {
                    let mut tracker = self.tracker();
                    let Some(emojis) = tracker.clear_reactions(message_id) else {
                        debug!("Discord: reactions cleared on untracked message {}", message_id);
                        return Vec::new();
                    };
                    let Some(tracked) = tracker.get(message_id) else {
                        return Vec::new();
                    };
                    (tracked.message.clone(), emojis)
                };
                emojis
                    .into_iter()
                    .filter_map(|emoji| {
                        let text = message.content.clone();
                        self.pending(session, &message, RelayBody::ReactionRemoved { emoji, text })
                    })
                    .collect()
            }
        }
    }

    fn prepare_deleted(&self, session: &GuildSession, message_id: MessageId) -> Option<Job> {
        let Some(tracked) = self.tracker().remove(message_id) else {
            debug!("Discord: deletion of untracked message {}", message_id);
            return None;
        };
        let body = RelayBody::Deleted(tracked.message.content.clone());
        self.pending(session, &tracked.message, body)
    }

    fn prepare_reaction(
        &self,
        session: &GuildSession,
        channel_id: ChannelId,
        message_id: MessageId,
        tracked: Option<MessageSnapshot>,
        emoji: String,
        added: bool,
    ) -> Vec<Job> {
        match tracked {
            Some(message) => {
                let text = message.content.clone();
                let body = if added {
                    RelayBody::ReactionAdded { emoji, text }
                } else {
                    RelayBody::ReactionRemoved { emoji, text }
                };
                self.pending(session, &message, body).into_iter().collect()
            }
            None if self.topic_of(channel_id).is_some() => vec![Job::FetchReaction {
                channel_id,
                message_id,
                emoji,
                added,
            }],
            None => Vec::new(),
        }
    }

    async fn run(&self, session: &GuildSession, job: Job) {
        match job {
            Job::Relay(pending) => self.relay(session, pending).await,
            Job::FetchReaction {
                channel_id,
                message_id,
                emoji,
                added,
            } => {
                let fetched = match session.gateway.fetch_message(channel_id, message_id).await {
                    Ok(fetched) => fetched,
                    Err(e) => {
                        debug!("Discord: could not fetch message {}: {}", message_id, e);
                        return;
                    }
                };
                let message = fetched.message.clone();
                self.tracker().insert(fetched);

                let text = message.content.clone();
                let body = if added {
                    RelayBody::ReactionAdded { emoji, text }
                } else {
                    RelayBody::ReactionRemoved { emoji, text }
                };
                if let Some(Job::Relay(pending)) = self.pending(session, &message, body) {
                    self.relay(session, pending).await;
                }
            }
        }
    }

    async fn relay(&self, session: &GuildSession, pending: PendingRelay) {
        let sender = match session.gateway.display_name(pending.author_id).await {
            Ok(name) => name,
            Err(e) => {
                debug!("Discord: unresolved sender {}: {}", pending.author_id, e);
                return;
            }
        };

        let message = pending.body.into_message(sender, pending.topic);
        self.destination.relay(EndpointKind::Discord, message);
    }
}

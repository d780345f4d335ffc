//! Bounded record of recent messages in the bridged channels.
//!
//! Gateway delete and remove-all events carry only ids. The tracker keeps
//! enough of each recent message (author, content, live reactions) to relay
//! them. Oldest entries are evicted first.

use std::collections::{HashMap, VecDeque};

use serenity::model::id::MessageId;

use crate::discord::events::MessageSnapshot;

/// Default number of messages kept.
pub const DEFAULT_TRACKED_MESSAGES: usize = 1000;

/// A tracked message and its current reactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedMessage {
    pub message: MessageSnapshot,
    /// Reaction labels with their counts, in first-seen order.
    pub reactions: Vec<(String, u64)>,
}

impl TrackedMessage {
    pub fn new(message: MessageSnapshot) -> Self {
        Self {
            message,
            reactions: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct RecentMessages {
    capacity: usize,
    order: VecDeque<MessageId>,
    messages: HashMap<MessageId, TrackedMessage>,
}

impl Default for RecentMessages {
    fn default() -> Self {
        Self::new(DEFAULT_TRACKED_MESSAGES)
    }
}

impl RecentMessages {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            messages: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: MessageId) -> Option<&TrackedMessage> {
        self.messages.get(&id)
    }

    /// Track a message, replacing any previous entry with the same id.
    pub fn insert(&mut self, tracked: TrackedMessage) {
        let id = tracked.message.id;
        if self.messages.insert(id, tracked).is_some() {
            return;
        }

        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.messages.remove(&evicted);
            }
        }
    }

    /// Replace a message's content and return the previous one.
    pub fn update_content(&mut self, id: MessageId, content: &str) -> Option<String> {
        let tracked = self.messages.get_mut(&id)?;
        Some(std::mem::replace(&mut tracked.message.content, content.to_string()))
    }

    pub fn remove(&mut self, id: MessageId) -> Option<TrackedMessage> {
        let tracked = self.messages.remove(&id)?;
        self.order.retain(|tracked_id| *tracked_id != id);
        Some(tracked)
    }

    /// Count one more reaction with `emoji`. Returns false for an unknown message.
    pub fn add_reaction(&mut self, id: MessageId, emoji: &str) -> bool {
        let Some(tracked) = self.messages.get_mut(&id) else {
            return false;
        };
        match tracked.reactions.iter_mut().find(|(label, _)| label == emoji) {
            Some((_, count)) => *count += 1,
            None => tracked.reactions.push((emoji.to_string(), 1)),
        }
        true
    }

    /// Count one reaction with `emoji` as removed. Returns false for an unknown message.
    pub fn remove_reaction(&mut self, id: MessageId, emoji: &str) -> bool {
        let Some(tracked) = self.messages.get_mut(&id) else {
            return false;
        };
        if let Some(position) = tracked.reactions.iter().position(|(label, _)| label == emoji) {
            let count = &mut tracked.reactions[position].1;
            *count = count.saturating_sub(1);
            if *count == 0 {
                tracked.reactions.remove(position);
            }
        }
        true
    }

    /// Drop every reaction with `emoji`. Returns false for an unknown message.
    pub fn clear_emoji(&mut self, id: MessageId, emoji: &str) -> bool {
        let Some(tracked) = self.messages.get_mut(&id) else {
            return false;
        };
        tracked.reactions.retain(|(label, _)| label != emoji);
        true
    }

    /// Drop all reactions and return the distinct labels that were present.
    pub fn clear_reactions(&mut self, id: MessageId) -> Option<Vec<String>> {
        let tracked = self.messages.get_mut(&id)?;
        Some(tracked.reactions.drain(..).map(|(label, _)| label).collect())
    }
}

//! Canonical message types for bridge communication.
//!
//! A `RelayedMessage` is built per inbound event, rendered once, and handed
//! to the destination endpoint. Nothing here outlives a single relay.

use crate::bridge::formatter::{format_message, format_system_message};

/// What happened on the source platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    /// A new chat message.
    Normal,
    /// A message was edited; text holds `{old} -> {new}`.
    Edited,
    /// A message was deleted; text holds the deleted content.
    Deleted,
    /// A reaction was added to a message.
    ReactionAdded,
    /// A reaction was removed from a message.
    ReactionRemoved,
}

impl RelayKind {
    /// Event label used by system notices.
    pub fn event_label(&self) -> Option<&'static str> {
        match self {
            RelayKind::Edited => Some("Changed"),
            RelayKind::Deleted => Some("Deleted"),
            RelayKind::Normal | RelayKind::ReactionAdded | RelayKind::ReactionRemoved => None,
        }
    }
}

/// One message on its way from one platform to the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedMessage {
    /// Sender's display name on the source platform.
    pub sender: String,
    /// Message body, already shaped for the event kind.
    pub text: String,
    /// Position of the source topic; the destination uses the same position.
    pub topic: usize,
    /// Event kind.
    pub kind: RelayKind,
}

impl RelayedMessage {
    pub fn new(kind: RelayKind, sender: impl Into<String>, text: impl Into<String>, topic: usize) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            topic,
            kind,
        }
    }

    /// Chat message relay.
    pub fn normal(sender: impl Into<String>, text: impl Into<String>, topic: usize) -> Self {
        Self::new(RelayKind::Normal, sender, text, topic)
    }

    /// Edit notice: `{old} -> {new}`.
    pub fn edited(sender: impl Into<String>, old: &str, new: &str, topic: usize) -> Self {
        Self::new(RelayKind::Edited, sender, format!("{{{}}} -> {{{}}}", old, new), topic)
    }

    /// Deletion notice carrying the deleted content.
    pub fn deleted(sender: impl Into<String>, text: impl Into<String>, topic: usize) -> Self {
        Self::new(RelayKind::Deleted, sender, text, topic)
    }

    /// Reaction notice: `:emoji: @ {text}`.
    pub fn reaction_added(sender: impl Into<String>, emoji: &str, text: &str, topic: usize) -> Self {
        Self::new(
            RelayKind::ReactionAdded,
            sender,
            format!(":{}: @ {{{}}}", emoji, text),
            topic,
        )
    }

    /// Reaction removal notice: `Removed :emoji: @ {text}`.
    pub fn reaction_removed(sender: impl Into<String>, emoji: &str, text: &str, topic: usize) -> Self {
        Self::new(
            RelayKind::ReactionRemoved,
            sender,
            format!("Removed :{}: @ {{{}}}", emoji, text),
            topic,
        )
    }

    /// Render the display string, or `None` when the message must not be relayed.
    ///
    /// System notices (edits, deletions) are always rendered, even when empty.
    pub fn render(&self) -> Option<String> {
        match self.kind.event_label() {
            Some(event) => Some(format_system_message(event, &self.sender, &self.text)),
            None => format_message(&self.sender, &self.text),
        }
    }
}

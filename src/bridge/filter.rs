//! Sender filtering.
//!
//! Messages from the bridge's own account are never relayed back (loop
//! prevention), and neither are messages from administratively ignored senders.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Why a sender was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The bridge's own account.
    OwnMessage,
    /// Listed in the ignore set.
    Ignored,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::OwnMessage => write!(f, "from me"),
            Rejection::Ignored => write!(f, "ignored id"),
        }
    }
}

/// Immutable ignore set for one platform's sender ids.
#[derive(Debug, Clone)]
pub struct SenderFilter<T: Eq + Hash> {
    ignored: HashSet<T>,
}

impl<T: Eq + Hash> SenderFilter<T> {
    pub fn new(ignored: impl IntoIterator<Item = T>) -> Self {
        Self {
            ignored: ignored.into_iter().collect(),
        }
    }

    /// Filter that only rejects the bridge's own messages.
    pub fn empty() -> Self {
        Self {
            ignored: HashSet::new(),
        }
    }

    /// Check a sender against the bridge's own id and the ignore set.
    pub fn check(&self, sender: &T, own_id: Option<&T>) -> Result<(), Rejection> {
        if own_id == Some(sender) {
            return Err(Rejection::OwnMessage);
        }
        if self.ignored.contains(sender) {
            return Err(Rejection::Ignored);
        }
        Ok(())
    }

    pub fn accepts(&self, sender: &T, own_id: Option<&T>) -> bool {
        self.check(sender, own_id).is_ok()
    }
}

//! Positional topic mapping.
//!
//! Each endpoint owns an ordered list of topic ids (grid groups or Discord
//! channels). Position `i` on one side pairs with position `i` on the other;
//! the list is fixed for the lifetime of the process.

/// Ordered, immutable list of topic identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicIndex<T> {
    topics: Vec<T>,
}

impl<T: PartialEq> TopicIndex<T> {
    pub fn new(topics: Vec<T>) -> Self {
        Self { topics }
    }

    /// Position of the first matching topic, or `None` for an unknown topic.
    pub fn index_of(&self, topic: &T) -> Option<usize> {
        self.topics.iter().position(|t| t == topic)
    }

    /// Topic at a position.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.topics.get(index)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.topics.iter()
    }
}

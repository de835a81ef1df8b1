//! Conversation History — bounded, ordered log of exchanged messages.
//!
//! Insertion order is conversation order. Capacity is enforced by `trim`, which
//! the coach session runs once per delivery cycle rather than per append, so a
//! reply being staged never loses its earlier units to its later ones.

use std::collections::VecDeque;

use crate::coach::message::Message;

#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    messages: VecDeque<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a history seeded with a single message (the coach greeting).
    pub fn seeded(message: Message) -> Self {
        let mut history = Self::new();
        history.append(message);
        history
    }

    /// Adds a message at the tail. Never reorders, never deduplicates.
    pub fn append(&mut self, message: Message) {
        self.messages.push_back(message);
    }

    /// Returns the last `max_messages` entries, oldest first.
    pub fn context_window(&self, max_messages: usize) -> Vec<&Message> {
        let start = self.messages.len().saturating_sub(max_messages);
        self.messages.range(start..).collect()
    }

    /// Evicts from the head until at most `max_capacity` entries remain.
    /// Returns how many messages were evicted.
    pub fn trim(&mut self, max_capacity: usize) -> usize {
        let excess = self.messages.len().saturating_sub(max_capacity);
        self.messages.drain(..excess);
        excess
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Owned snapshot, oldest first.
    pub fn to_vec(&self) -> Vec<Message> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(history: &ConversationHistory) -> Vec<String> {
        history.iter().map(|m| m.text().to_string()).collect()
    }

    #[test]
    fn test_append_keeps_insertion_order_and_duplicates() {
        let mut history = ConversationHistory::new();
        history.append(Message::user("same"));
        history.append(Message::assistant("same"));
        history.append(Message::user("last"));
        assert_eq!(texts(&history), vec!["same", "same", "last"]);
    }

    #[test]
    fn test_context_window_returns_tail_oldest_first() {
        let mut history = ConversationHistory::new();
        for i in 0..8 {
            history.append(Message::user(format!("m{i}")));
        }
        let window: Vec<&str> = history.context_window(3).iter().map(|m| m.text()).collect();
        assert_eq!(window, vec!["m5", "m6", "m7"]);
    }

    #[test]
    fn test_context_window_shorter_than_requested() {
        let history = ConversationHistory::seeded(Message::assistant("hello"));
        assert_eq!(history.context_window(6).len(), 1);
        assert!(history.context_window(0).is_empty());
    }

    #[test]
    fn test_trim_keeps_most_recent_in_order() {
        let capacity = 10;
        let mut history = ConversationHistory::new();
        for i in 0..25 {
            history.append(Message::user(format!("m{i}")));
        }
        assert_eq!(history.trim(capacity), 15);
        assert_eq!(history.len(), capacity);
        let expected: Vec<String> = (15..25).map(|i| format!("m{i}")).collect();
        assert_eq!(texts(&history), expected);
    }

    #[test]
    fn test_trim_is_idempotent() {
        let mut history = ConversationHistory::new();
        for i in 0..5 {
            history.append(Message::user(format!("m{i}")));
        }
        history.trim(3);
        let once = texts(&history);
        assert_eq!(history.trim(3), 0);
        assert_eq!(texts(&history), once);
    }

    #[test]
    fn test_trim_under_capacity_is_noop() {
        let mut history = ConversationHistory::seeded(Message::assistant("hi"));
        assert_eq!(history.trim(10), 0);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_clear_empties_history() {
        let mut history = ConversationHistory::seeded(Message::assistant("hi"));
        history.clear();
        assert!(history.is_empty());
    }
}

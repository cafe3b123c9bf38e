//! In-memory ordered log of transcript entries.

use parley_core::Message;

/// Append-only (until cleared) message log. Insertion order is the
/// rendering order regardless of timestamps.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
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

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// True if any entry's text is exactly `text` as a single string.
    pub fn contains_text(&self, text: &str) -> bool {
        self.messages.iter().any(|m| m.text.is_exactly(text))
    }

    /// Distinct user-authored texts, in first-seen order.
    pub fn user_texts(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for message in self.messages.iter().filter(|m| m.is_user) {
            let text = message.text.to_plain();
            if !text.trim().is_empty() && !seen.contains(&text) {
                seen.push(text);
            }
        }
        seen
    }
}

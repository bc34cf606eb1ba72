//! Conversation History
//!
//! Append-only record of completed user/assistant turns. The store keeps
//! everything; how much of it is replayed to the model is decided by the
//! agent's history window.

use crate::message::Message;

/// Ordered log of completed turns
#[derive(Clone, Debug, Default)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message at the end
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Owned copy of every stored message, oldest first
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// The last `n` messages (all of them if fewer are stored)
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Drop every stored message
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

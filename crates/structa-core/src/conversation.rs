//! Conversation store — the append-only message history of one agent.
//!
//! The system message is never stored here; the agent synthesizes it fresh
//! and prepends it when it builds a request.

use crate::types::{Message, Role};

/// Ordered, append-only list of conversation messages.
///
/// The only mutation besides `append` is [`ConversationStore::clear`], which
/// is reserved for the host (e.g. a `/clear` command), never the agent loop.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with a previously persisted history.
    ///
    /// System messages in the input are dropped: the active system message
    /// always comes from the agent that owns the store.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: messages.into_iter().filter(|m| !m.is_system()).collect(),
        }
    }

    /// Append a message to the end of the conversation.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a message built from a role and text.
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.append(Message::new(role, content));
    }

    /// All messages in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop every message. Host-initiated only.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Consume the store, yielding the message list for persistence.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

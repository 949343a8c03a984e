//! Conversation domain entities

use super::value_objects::ConversationId;
use crate::core::error::DomainError;
use crate::session::entities::Message;
use serde::{Deserialize, Serialize};

/// A conversation thread (Entity)
///
/// Messages keep insertion order. A conversation with zero messages is valid;
/// that is the shape of a freshly created thread. `timestamp` is the creation
/// time in milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    name: String,
    messages: Vec<Message>,
    timestamp: i64,
}

impl Conversation {
    pub fn new(id: ConversationId, name: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id,
            name: name.into(),
            messages: Vec::new(),
            timestamp,
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Overwrite the final message in place.
    pub fn replace_last(&mut self, message: Message) -> Result<(), DomainError> {
        match self.messages.last_mut() {
            Some(last) => {
                *last = message;
                Ok(())
            }
            None => Err(DomainError::EmptySequence(self.id.clone())),
        }
    }

    /// Remove and return the final message.
    pub fn pop_last(&mut self) -> Result<Message, DomainError> {
        self.messages
            .pop()
            .ok_or_else(|| DomainError::EmptySequence(self.id.clone()))
    }
}

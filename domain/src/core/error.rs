//! Domain error types

use crate::conversation::value_objects::ConversationId;
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An operation referenced a conversation id that does not exist.
    #[error("Conversation not found: {0}")]
    NotFound(ConversationId),

    /// An operation needed a last message but the conversation has none.
    #[error("Conversation {0} has no messages")]
    EmptySequence(ConversationId),
}

impl DomainError {
    /// Check if this error is an invariant violation rather than a caller mistake
    pub fn is_defect(&self) -> bool {
        matches!(self, DomainError::EmptySequence(_))
    }
}

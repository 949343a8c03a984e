//! Conversation domain.
//!
//! - [`entities::Conversation`]: one persisted, selectable thread of messages
//! - [`value_objects::ConversationId`]: opaque identifier of a thread

pub mod entities;
pub mod value_objects;

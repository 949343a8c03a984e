//! Domain layer for parley
//!
//! This crate contains the conversation entities, session value objects and
//! the signals a presentation layer derives its state from. It has no
//! dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! - **Conversation**: an ordered thread of user/assistant [`Message`]s,
//!   independently persisted and selectable.
//! - **Session state**: where the single in-flight exchange currently is
//!   ([`SessionState`]), and the signals derived from it ([`SessionSignals`]).
//! - **Animation cue**: the abstract reaction ([`AnimationCue`]) an avatar
//!   renderer maps to a concrete animation.

pub mod conversation;
pub mod core;
pub mod session;

// Re-export commonly used types
pub use conversation::{entities::Conversation, value_objects::ConversationId};
pub use crate::core::{
    error::DomainError,
    string::{preview, truncate},
};
pub use session::{
    entities::{Message, Role},
    signals::{AnimationCue, ErrorInfo, QueryErrorKind, SessionSignals, SessionState},
};

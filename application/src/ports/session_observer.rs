//! Session observer port
//!
//! Presentation layers subscribe to the engine through this interface.
//! Callbacks run inline on the engine's task, between transitions, so they
//! must not block.

use parley_domain::{ConversationId, Message, SessionSignals};

/// Callback for signal and message updates during a session
pub trait SessionObserver: Send + Sync {
    /// Called after every state transition.
    fn on_signals_changed(&self, _signals: &SessionSignals) {}

    /// Called when the last message of `conversation` was appended or
    /// replaced. For a streaming answer `message.content` is the complete
    /// text so far, never a delta.
    fn on_message_updated(&self, _conversation: &ConversationId, _message: &Message) {}

    /// Called when the last message of `conversation` was removed, e.g. the
    /// placeholder of a failed query.
    fn on_message_removed(&self, _conversation: &ConversationId) {}
}

/// No-op observer for when nobody is listening
pub struct NoSessionObserver;

impl SessionObserver for NoSessionObserver {}

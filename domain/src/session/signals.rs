//! Session state and the presentation signals derived from it.
//!
//! [`SessionSignals`] is a pure function of [`SessionState`] plus the last
//! error; it has no lifecycle of its own and is never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of the single in-flight exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Query sent, placeholder appended, no chunk yet.
    AwaitingFirstChunk,
    /// At least one chunk merged into the placeholder.
    Streaming,
    /// Last query failed; returns to `Idle` after the recovery delay.
    Error,
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            SessionState::AwaitingFirstChunk | SessionState::Streaming
        )
    }

    /// Whether a new submission is accepted in this state.
    pub fn accepts_input(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Error)
    }

    pub fn animation_cue(&self) -> AnimationCue {
        match self {
            SessionState::Idle => AnimationCue::Idle,
            SessionState::AwaitingFirstChunk | SessionState::Streaming => AnimationCue::Thinking,
            SessionState::Error => AnimationCue::Error,
        }
    }
}

/// Abstract avatar reaction, independent of any concrete animation asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationCue {
    #[default]
    Idle,
    Thinking,
    Error,
}

impl AnimationCue {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimationCue::Idle => "idle",
            AnimationCue::Thinking => "thinking",
            AnimationCue::Error => "error",
        }
    }
}

impl fmt::Display for AnimationCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying cause of a failed query, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryErrorKind {
    /// Connection could not be established or was interrupted.
    Network,
    /// Remote answered with a non-success status.
    Protocol,
    /// Response bytes were not valid text.
    Decode,
    /// The streamed answer could not be written to the conversation store.
    Storage,
}

impl QueryErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryErrorKind::Network => "network",
            QueryErrorKind::Protocol => "protocol",
            QueryErrorKind::Decode => "decode",
            QueryErrorKind::Storage => "storage",
        }
    }
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unified "query failed" condition shown to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: QueryErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query failed ({}): {}", self.kind, self.message)
    }
}

/// Derived signals consumed by presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSignals {
    pub is_loading: bool,
    pub animation_cue: AnimationCue,
    pub last_error: Option<ErrorInfo>,
}

impl SessionSignals {
    pub fn derive(state: SessionState, last_error: Option<&ErrorInfo>) -> Self {
        Self {
            is_loading: state.is_loading(),
            animation_cue: state.animation_cue(),
            last_error: last_error.cloned(),
        }
    }
}

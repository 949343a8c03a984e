//! Conversation store port
//!
//! Durable mirror of the repository's conversations, local to the device.
//! Every `save` writes a full snapshot; callers debounce if they need to.

use parley_domain::Conversation;
use std::sync::Mutex;
use thiserror::Error;

/// Errors that can occur while writing a snapshot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Persistent storage of the full conversation set.
///
/// `load` fails soft: missing, unreadable or corrupt data yields an empty
/// list so the caller can bootstrap. `save` is all-or-nothing: after an
/// `Err` the previously stored snapshot is still intact.
pub trait ConversationStore: Send + Sync {
    fn load(&self) -> Vec<Conversation>;

    fn save(&self, conversations: &[Conversation]) -> Result<(), StoreError>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct InMemoryConversationStore {
    snapshot: Mutex<Vec<Conversation>>,
    fail_saves: Mutex<bool>,
    saves: Mutex<usize>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `conversations`.
    pub fn with_conversations(conversations: Vec<Conversation>) -> Self {
        Self {
            snapshot: Mutex::new(conversations),
            ..Self::default()
        }
    }

    /// Current stored snapshot.
    pub fn snapshot(&self) -> Vec<Conversation> {
        self.snapshot.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_saves.lock() {
            *flag = fail;
        }
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn load(&self) -> Vec<Conversation> {
        self.snapshot()
    }

    fn save(&self, conversations: &[Conversation]) -> Result<(), StoreError> {
        if self.fail_saves.lock().map(|f| *f).unwrap_or(false) {
            return Err(StoreError::Io("save disabled".to_string()));
        }
        let mut snapshot = self
            .snapshot
            .lock()
            .map_err(|e| StoreError::Io(e.to_string()))?;
        *snapshot = conversations.to_vec();
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}

//! Conversation repository
//!
//! [`ConversationRepository`] exclusively owns the in-memory conversation set
//! and the active selection. Every structural mutation writes a full snapshot
//! through the [`ConversationStore`] before it returns; if that write fails the
//! mutation is rolled back, so memory and store never disagree.

use crate::ports::clock::Clock;
use crate::ports::conversation_store::{ConversationStore, StoreError};
use chrono::{DateTime, Utc};
use parley_domain::{Conversation, ConversationId, DomainError, Message};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Per-process id sequence, shared by every repository instance.
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Errors that can occur during repository operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Conversation not found: {0}")]
    NotFound(ConversationId),

    #[error("Conversation {0} has no messages")]
    EmptySequence(ConversationId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DomainError> for RepositoryError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(id) => RepositoryError::NotFound(id),
            DomainError::EmptySequence(id) => RepositoryError::EmptySequence(id),
        }
    }
}

/// Name given to conversations created without an explicit name.
pub fn default_conversation_name(now: DateTime<Utc>) -> String {
    format!("Conversation {}", now.format("%Y-%m-%d %H:%M"))
}

/// In-memory collection of conversation threads backed by a store.
pub struct ConversationRepository {
    store: Arc<dyn ConversationStore>,
    clock: Arc<dyn Clock>,
    conversations: Vec<Conversation>,
    active_id: Option<ConversationId>,
}

impl ConversationRepository {
    /// Create an empty repository. Call [`bootstrap`](Self::bootstrap) before use.
    pub fn new(store: Arc<dyn ConversationStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            conversations: Vec::new(),
            active_id: None,
        }
    }

    /// Load persisted conversations, or synthesize the first one.
    ///
    /// With stored data, the most recently created conversation becomes
    /// active (ties go to the one stored last). With none, exactly one empty
    /// conversation is created and persisted immediately.
    pub fn bootstrap(&mut self) -> Result<(), RepositoryError> {
        let mut loaded = self.store.load();

        let before = loaded.len();
        let mut seen = std::collections::HashSet::new();
        loaded.retain(|c| seen.insert(c.id().clone()));
        if loaded.len() != before {
            warn!(
                "Dropped {} stored conversations with duplicate ids",
                before - loaded.len()
            );
        }

        if loaded.is_empty() {
            info!("No stored conversations, creating the first one");
            self.conversations.clear();
            self.active_id = None;
            self.create_conversation()?;
            return Ok(());
        }

        info!("Loaded {} stored conversations", loaded.len());
        self.conversations = loaded;
        self.active_id = self.most_recent_id();
        Ok(())
    }

    /// Create an empty conversation, make it active and persist the set.
    pub fn create_conversation(&mut self) -> Result<Conversation, RepositoryError> {
        let now = self.clock.now();
        let id = self.generate_id(now.timestamp_millis());
        let conversation =
            Conversation::new(id.clone(), default_conversation_name(now), now.timestamp_millis());

        self.conversations.push(conversation.clone());
        let previous_active = self.active_id.replace(id.clone());
        if let Err(e) = self.persist() {
            self.conversations.pop();
            self.active_id = previous_active;
            return Err(e);
        }

        info!("Created conversation {} ({})", id, conversation.name());
        Ok(conversation)
    }

    /// Make `id` the active conversation and return its messages.
    pub fn select_conversation(
        &mut self,
        id: &ConversationId,
    ) -> Result<&[Message], RepositoryError> {
        let index = self.index_of(id)?;
        self.active_id = Some(id.clone());
        debug!("Selected conversation {}", id);
        Ok(self.conversations[index].messages())
    }

    /// Remove a conversation and persist the set.
    ///
    /// Deleting the active conversation re-selects the most recent remaining
    /// one, or leaves nothing active when none remain.
    pub fn delete_conversation(&mut self, id: &ConversationId) -> Result<(), RepositoryError> {
        let index = self.index_of(id)?;
        let removed = self.conversations.remove(index);
        let previous_active = self.active_id.clone();
        if self.active_id.as_ref() == Some(id) {
            self.active_id = self.most_recent_id();
        }

        if let Err(e) = self.persist() {
            self.conversations.insert(index, removed);
            self.active_id = previous_active;
            return Err(e);
        }

        info!(
            "Deleted conversation {}, active is now {:?}",
            id,
            self.active_id.as_ref().map(ConversationId::as_str)
        );
        Ok(())
    }

    /// Append `message` to a conversation and persist.
    pub fn append_message(
        &mut self,
        id: &ConversationId,
        message: Message,
    ) -> Result<(), RepositoryError> {
        let index = self.index_of(id)?;
        self.conversations[index].push(message);

        if let Err(e) = self.persist() {
            // The message was just pushed, so the sequence is non-empty.
            let _ = self.conversations[index].pop_last();
            return Err(e);
        }
        Ok(())
    }

    /// Overwrite the last message of a conversation and persist.
    pub fn replace_last_message(
        &mut self,
        id: &ConversationId,
        message: Message,
    ) -> Result<(), RepositoryError> {
        let index = self.index_of(id)?;
        let conversation = &mut self.conversations[index];
        let Some(previous) = conversation.last_message().cloned() else {
            error!("replace_last_message on empty conversation {}", id);
            return Err(RepositoryError::EmptySequence(id.clone()));
        };
        conversation.replace_last(message)?;

        if let Err(e) = self.persist() {
            let _ = self.conversations[index].replace_last(previous);
            return Err(e);
        }
        Ok(())
    }

    /// Remove the last message of a conversation and persist.
    pub fn remove_last_message(&mut self, id: &ConversationId) -> Result<Message, RepositoryError> {
        let index = self.index_of(id)?;
        let removed = match self.conversations[index].pop_last() {
            Ok(message) => message,
            Err(e) => {
                if e.is_defect() {
                    error!("remove_last_message on empty conversation {}", id);
                }
                return Err(e.into());
            }
        };

        if let Err(e) = self.persist() {
            self.conversations[index].push(removed);
            return Err(e);
        }
        Ok(removed)
    }

    /// Remove the last message of a conversation, keeping the removal in
    /// memory even when the save fails.
    ///
    /// Used to drop a message that must not survive, such as the placeholder
    /// of a failed exchange. A failed save is logged and the returned
    /// [`StoreError`] tells the caller the store is behind; the next
    /// successful save writes the corrected snapshot.
    pub fn discard_last_message(
        &mut self,
        id: &ConversationId,
    ) -> Result<(Message, Option<StoreError>), RepositoryError> {
        let index = self.index_of(id)?;
        let removed = match self.conversations[index].pop_last() {
            Ok(message) => message,
            Err(e) => {
                error!("discard_last_message on empty conversation {}", id);
                return Err(e.into());
            }
        };

        match self.store.save(&self.conversations) {
            Ok(()) => Ok((removed, None)),
            Err(e) => {
                error!("Could not persist removal from {}: {}", id, e);
                Ok((removed, Some(e)))
            }
        }
    }

    /// All conversations in insertion order.
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id() == id)
    }

    pub fn active_id(&self) -> Option<&ConversationId> {
        self.active_id.as_ref()
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.active_id.as_ref().and_then(|id| self.get(id))
    }

    /// Messages of the active conversation (empty when nothing is active).
    pub fn active_messages(&self) -> &[Message] {
        self.active().map(Conversation::messages).unwrap_or(&[])
    }

    /// Id of the active conversation, resolving an absent selection first.
    ///
    /// Picks the most recent conversation when one exists, otherwise creates
    /// a new one.
    pub fn ensure_active(&mut self) -> Result<ConversationId, RepositoryError> {
        if let Some(id) = &self.active_id {
            return Ok(id.clone());
        }
        if let Some(id) = self.most_recent_id() {
            info!("No active conversation, selecting most recent {}", id);
            self.active_id = Some(id.clone());
            return Ok(id);
        }
        Ok(self.create_conversation()?.id().clone())
    }

    fn index_of(&self, id: &ConversationId) -> Result<usize, RepositoryError> {
        self.conversations
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))
    }

    fn most_recent_id(&self) -> Option<ConversationId> {
        // max_by_key keeps the last of equal maxima.
        self.conversations
            .iter()
            .max_by_key(|c| c.timestamp())
            .map(|c| c.id().clone())
    }

    fn generate_id(&self, timestamp_ms: i64) -> ConversationId {
        loop {
            let sequence = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
            let id = ConversationId::from_parts(timestamp_ms, sequence);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    fn persist(&self) -> Result<(), RepositoryError> {
        self.store.save(&self.conversations).map_err(|e| {
            warn!("Failed to persist conversations: {}", e);
            RepositoryError::Store(e)
        })
    }
}

//! Conversation storage adapters.
//!
//! Provides [`JsonFileConversationStore`], which keeps the whole conversation
//! set as one JSON array in a single file.

mod json_file;

pub use json_file::{JsonFileConversationStore, STORAGE_KEY};

//! JSON file implementation of the conversation store.
//!
//! The file holds `[{id, name, messages: [{role, content}], timestamp}]`.
//! Saves go to a sibling temp file that is renamed over the target, so a
//! crash mid-write leaves the previous snapshot in place.

use parley_application::ports::conversation_store::{ConversationStore, StoreError};
use parley_domain::Conversation;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Fixed key (file stem) the snapshot is stored under.
pub const STORAGE_KEY: &str = "conversations";

/// Conversation store backed by a single JSON file.
pub struct JsonFileConversationStore {
    path: PathBuf,
}

impl JsonFileConversationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in `dir` under the fixed storage key.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{STORAGE_KEY}.json")))
    }

    /// `$XDG_DATA_HOME/parley/conversations.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("parley").join(format!("{STORAGE_KEY}.json")))
    }

    /// Get the path to the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| STORAGE_KEY.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ConversationStore for JsonFileConversationStore {
    fn load(&self) -> Vec<Conversation> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No conversation store at {}", self.path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!(
                    "Could not read conversation store {}: {}",
                    self.path.display(),
                    e
                );
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<Conversation>>(&bytes) {
            Ok(conversations) => conversations,
            Err(e) => {
                warn!(
                    "Conversation store {} is corrupt, starting empty: {}",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    fn save(&self, conversations: &[Conversation]) -> Result<(), StoreError> {
        let json =
            serde_json::to_vec(conversations).map_err(|e| StoreError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }

        let temp = self.temp_path();
        fs::write(&temp, &json).map_err(|e| StoreError::Io(e.to_string()))?;
        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(StoreError::Io(e.to_string()));
        }

        debug!(
            "Saved {} conversations ({} bytes) to {}",
            conversations.len(),
            json.len(),
            self.path.display()
        );
        Ok(())
    }
}

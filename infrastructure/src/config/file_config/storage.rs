//! Storage configuration from TOML (`[storage]` section)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::storage::JsonFileConversationStore;

/// Raw storage configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Path of the conversations file; `~/` is expanded
    pub path: Option<String>,
}

impl FileStorageConfig {
    /// Resolve the conversations file path.
    ///
    /// Falls back to the platform data directory, then to the working
    /// directory when no data directory is known.
    pub fn resolve_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => expand_home(path),
            None => JsonFileConversationStore::default_path()
                .unwrap_or_else(|| PathBuf::from("conversations.json")),
        }
    }
}

/// Expand a leading `~/` to the home directory.
pub(crate) fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_is_used() {
        let config = FileStorageConfig {
            path: Some("/srv/parley/store.json".to_string()),
        };
        assert_eq!(config.resolve_path(), PathBuf::from("/srv/parley/store.json"));
    }

    #[test]
    fn test_default_path_ends_with_store_file() {
        let path = FileStorageConfig::default().resolve_path();
        assert!(path.ends_with("conversations.json"));
    }

    #[test]
    fn test_home_is_expanded() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(expand_home("~/notes/c.json"), home.join("notes/c.json"));
        assert_eq!(expand_home("rel/~/c.json"), PathBuf::from("rel/~/c.json"));
    }
}

//! Transcript logging configuration from TOML (`[logging]` section)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::storage::expand_home;
use crate::logging::JsonlConversationLogger;

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Record every exchange as JSONL
    pub transcript: bool,
    /// Transcript file; defaults beside the conversations file
    pub transcript_path: Option<String>,
}

impl FileLoggingConfig {
    /// Transcript file to write, or `None` when transcripts are off.
    pub fn resolve_transcript_path(&self) -> Option<PathBuf> {
        if !self.transcript {
            return None;
        }
        Some(match &self.transcript_path {
            Some(path) => expand_home(path),
            None => JsonlConversationLogger::default_path()
                .unwrap_or_else(|| PathBuf::from("transcript.jsonl")),
        })
    }
}

//! Presentation-level configuration
//!
//! Settings for the interactive chat.

use crate::chat::RustylineReader;
use std::path::PathBuf;

/// REPL configuration for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplConfig {
    /// Print the welcome banner on start
    pub show_welcome: bool,
    /// Endpoint shown in the welcome banner
    pub endpoint: String,
    /// Prompt history file; `None` keeps history in memory only
    pub history_file: Option<PathBuf>,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            show_welcome: true,
            endpoint: String::new(),
            history_file: RustylineReader::default_history_path(),
        }
    }
}

//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every section falls back to its defaults when absent.

mod endpoint;
mod logging;
mod output;
mod session;
mod storage;

pub use endpoint::FileEndpointConfig;
pub use logging::FileLoggingConfig;
pub use output::FileOutputConfig;
pub use session::FileSessionConfig;
pub use storage::FileStorageConfig;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Remote query endpoint
    pub endpoint: FileEndpointConfig,
    /// Session engine timing
    pub session: FileSessionConfig,
    /// Conversation storage location
    pub storage: FileStorageConfig,
    /// Transcript logging
    pub logging: FileLoggingConfig,
    /// Terminal output
    pub output: FileOutputConfig,
}

/// A configuration value that cannot be used as given.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("endpoint.base_url: '{value}' is not a valid http(s) URL ({reason})")]
    InvalidBaseUrl { value: String, reason: String },

    #[error("session.error_recovery_ms must be greater than zero")]
    ZeroRecoveryDelay,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        if let Err(e) = self.endpoint.parse_base_url() {
            issues.push(e);
        }
        if self.session.error_recovery_ms == 0 {
            issues.push(ConfigValidationError::ZeroRecoveryDelay);
        }

        issues
    }
}

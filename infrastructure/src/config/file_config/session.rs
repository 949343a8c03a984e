//! Session configuration from TOML (`[session]` section)

use parley_application::SessionConfig;
use parley_application::config::DEFAULT_ERROR_RECOVERY;
use serde::{Deserialize, Serialize};

/// Raw session configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSessionConfig {
    /// Milliseconds the engine stays in `Error` before returning to `Idle`
    pub error_recovery_ms: u64,
}

impl Default for FileSessionConfig {
    fn default() -> Self {
        Self {
            error_recovery_ms: DEFAULT_ERROR_RECOVERY.as_millis() as u64,
        }
    }
}

impl FileSessionConfig {
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig::with_error_recovery_ms(self.error_recovery_ms)
    }
}

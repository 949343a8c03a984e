//! Application-level configuration.
//!
//! Controls runtime behavior of the session engine.

use std::time::Duration;

/// Delay before the engine leaves `Error` on its own.
pub const DEFAULT_ERROR_RECOVERY: Duration = Duration::from_millis(3000);

/// Session engine behavior configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Fixed delay of the timed `Error -> Idle` transition.
    pub error_recovery_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            error_recovery_delay: DEFAULT_ERROR_RECOVERY,
        }
    }
}

impl SessionConfig {
    /// Creates a SessionConfig with the recovery delay given in milliseconds.
    pub fn with_error_recovery_ms(millis: u64) -> Self {
        Self {
            error_recovery_delay: Duration::from_millis(millis),
        }
    }
}

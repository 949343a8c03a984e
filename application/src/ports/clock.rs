//! Clock port
//!
//! Conversation ids, creation timestamps and default names all derive from
//! the current time; injecting it keeps repository behavior deterministic.

use chrono::{DateTime, Utc};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that always returns the same instant.
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Fixed clock at `millis` since the Unix epoch (falls back to the epoch).
    pub fn from_millis(millis: i64) -> Self {
        Self(DateTime::from_timestamp_millis(millis).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

//! Conversation value objects

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque conversation identifier.
///
/// Serialized as a bare string so the stored snapshot keeps the
/// `[{id, name, messages, timestamp}]` shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Time-based id: creation millis plus a per-process sequence number.
    pub fn from_parts(timestamp_ms: i64, sequence: u64) -> Self {
        Self(format!("{timestamp_ms}-{sequence}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_format() {
        let id = ConversationId::from_parts(1_700_000_000_000, 3);
        assert_eq!(id.as_str(), "1700000000000-3");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = ConversationId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let back: ConversationId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(back, id);
    }
}

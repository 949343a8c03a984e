//! Append-only JSONL transcript of session events.
//!
//! Every [`ConversationEvent`] becomes one line carrying its payload plus
//! `type` and `timestamp`. The file is opened for append, so restarts extend
//! the same transcript.

use parley_application::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Transcript logger backed by a line-buffered file.
pub struct JsonlConversationLogger {
    // LineWriter hands each complete line to the OS
    file: Mutex<LineWriter<File>>,
    path: PathBuf,
}

impl JsonlConversationLogger {
    /// Open `path` for append, creating it and its parent directories.
    /// Returns `None` when the transcript cannot be opened.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        let opened = path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| OpenOptions::new().create(true).append(true).open(path));

        match opened {
            Ok(file) => Some(Self {
                file: Mutex::new(LineWriter::new(file)),
                path: path.to_path_buf(),
            }),
            Err(e) => {
                warn!("Could not open transcript {}: {}", path.display(), e);
                None
            }
        }
    }

    /// `$XDG_DATA_HOME/parley/transcript.jsonl`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("parley").join("transcript.jsonl"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Object payloads gain `type` and `timestamp` keys; anything else is
/// nested under `data`.
fn transcript_record(event: ConversationEvent, timestamp: String) -> Value {
    let mut record = match event.payload {
        Value::Object(map) => map,
        other => Map::from_iter([("data".to_string(), other)]),
    };
    record.insert("type".to_string(), Value::from(event.event_type));
    record.insert("timestamp".to_string(), Value::from(timestamp));
    Value::Object(record)
}

impl ConversationLogger for JsonlConversationLogger {
    fn log(&self, event: ConversationEvent) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let mut line = transcript_record(event, timestamp).to_string();
        line.push('\n');

        let Ok(mut file) = self.file.lock() else {
            return;
        };
        if let Err(e) = file.write_all(line.as_bytes()) {
            warn!("Could not append to transcript {}: {}", self.path.display(), e);
        }
    }
}

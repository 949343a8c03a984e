//! Infrastructure layer for parley
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the JSON file store, the streaming HTTP
//! client, configuration file loading and the JSONL transcript logger.

pub mod config;
pub mod http;
pub mod logging;
pub mod storage;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileEndpointConfig, FileLoggingConfig,
    FileOutputConfig, FileSessionConfig, FileStorageConfig,
};
pub use http::{DEFAULT_BASE_URL, HttpQueryClient, Utf8StreamDecoder, decode_text_stream};
pub use logging::JsonlConversationLogger;
pub use storage::{JsonFileConversationStore, STORAGE_KEY};

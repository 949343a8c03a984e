//! Application layer for parley
//!
//! This crate contains the conversation repository, the session engine use
//! case, port definitions and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod repository;
pub mod use_cases;

// Re-export commonly used types
pub use config::SessionConfig;
pub use ports::{
    clock::{Clock, FixedClock, SystemClock},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    conversation_store::{ConversationStore, InMemoryConversationStore, StoreError},
    query_client::{ChunkStream, QueryClient, QueryError},
    session_observer::{NoSessionObserver, SessionObserver},
};
pub use repository::{ConversationRepository, RepositoryError, default_conversation_name};
pub use use_cases::session_engine::{SessionEngine, SessionError, SubmitOutcome};

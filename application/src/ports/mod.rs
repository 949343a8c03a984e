//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod clock;
pub mod conversation_logger;
pub mod conversation_store;
pub mod query_client;
pub mod session_observer;

//! Session domain.
//!
//! - [`entities::Message`]: a single message within a conversation
//! - [`signals::SessionState`]: state of the one in-flight exchange
//! - [`signals::SessionSignals`]: loading / cue / error view derived from it

pub mod entities;
pub mod signals;

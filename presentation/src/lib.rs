//! Presentation layer for parley
//!
//! This crate contains CLI definitions, the console formatter, the live
//! stream reporter, avatar animation selection and the interactive chat.

pub mod avatar;
pub mod chat;
pub mod cli;
pub mod config;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use avatar::{AvatarAnimator, animation_for};
pub use chat::{ChatRepl, ReplCommand};
pub use cli::commands::Cli;
pub use config::ReplConfig;
pub use output::console::ConsoleFormatter;
pub use progress::reporter::{ConsoleObserver, StreamPrinter};

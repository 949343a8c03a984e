//! Interactive chat module
//!
//! Provides a line-edited interactive chat over the session engine.

mod editor;
mod repl;

pub use editor::{LineEditor, LineReader, ReadEvent, RustylineReader};
pub use repl::{ChatRepl, ReplCommand};

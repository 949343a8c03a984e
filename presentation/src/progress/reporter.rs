//! Console rendering of a streaming exchange

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use parley_application::SessionObserver;
use parley_domain::{ConversationId, Message, Role, SessionSignals};
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::avatar::AvatarAnimator;
use crate::output::console::ConsoleFormatter;

/// Tracks how much of the streaming answer has been printed.
///
/// The engine reports the full text so far on every chunk; only the new
/// suffix is written to the terminal.
#[derive(Debug, Default)]
pub struct StreamPrinter {
    printed: usize,
}

impl StreamPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the part of `content` not yet printed.
    pub fn delta<'a>(&mut self, content: &'a str) -> &'a str {
        let delta = match content.get(self.printed..) {
            Some(rest) => rest,
            None => content,
        };
        self.printed = content.len();
        delta
    }

    pub fn has_output(&self) -> bool {
        self.printed > 0
    }

    pub fn reset(&mut self) {
        self.printed = 0;
    }
}

struct ReporterState {
    spinner: Option<ProgressBar>,
    printer: StreamPrinter,
    avatar: AvatarAnimator,
}

/// [`SessionObserver`] that draws a spinner while waiting and prints the
/// answer as it streams in.
pub struct ConsoleObserver {
    show_progress: bool,
    state: Mutex<ReporterState>,
}

impl ConsoleObserver {
    pub fn new(show_progress: bool) -> Self {
        Self {
            show_progress,
            state: Mutex::new(ReporterState {
                spinner: None,
                printer: StreamPrinter::new(),
                avatar: AvatarAnimator::new(),
            }),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn start_spinner() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_message("Thinking...".dimmed().to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SessionObserver for ConsoleObserver {
    fn on_signals_changed(&self, signals: &SessionSignals) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        if let Some(clip) = state.avatar.update(signals.animation_cue) {
            debug!("Avatar animation -> {}", clip);
        }

        if signals.is_loading {
            if self.show_progress && state.spinner.is_none() && !state.printer.has_output() {
                state.spinner = Some(Self::start_spinner());
            }
            return;
        }

        if let Some(pb) = state.spinner.take() {
            pb.finish_and_clear();
        }
        if state.printer.has_output() {
            println!();
        }
        state.printer.reset();

        if let Some(error) = &signals.last_error {
            eprintln!("{}", ConsoleFormatter::error(error));
        }
    }

    fn on_message_updated(&self, _conversation: &ConversationId, message: &Message) {
        if message.role != Role::Assistant || message.content.is_empty() {
            return;
        }
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        if let Some(pb) = state.spinner.take() {
            pb.finish_and_clear();
        }
        if !state.printer.has_output() {
            print!("{} ", ConsoleFormatter::role_label(Role::Assistant));
        }
        let delta = state.printer.delta(&message.content);
        print!("{}", delta);
        let _ = std::io::stdout().flush();
    }

    fn on_message_removed(&self, _conversation: &ConversationId) {
        if let Ok(mut state) = self.state.lock() {
            if state.printer.has_output() {
                println!();
            }
            state.printer.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printer_emits_only_new_suffix() {
        let mut printer = StreamPrinter::new();
        assert!(!printer.has_output());
        assert_eq!(printer.delta("Hi"), "Hi");
        assert_eq!(printer.delta("Hi there"), " there");
        assert_eq!(printer.delta("Hi there"), "");
        assert!(printer.has_output());
    }

    #[test]
    fn test_printer_reset_starts_over() {
        let mut printer = StreamPrinter::new();
        printer.delta("first answer");
        printer.reset();
        assert_eq!(printer.delta("next"), "next");
    }

    #[test]
    fn test_printer_handles_non_boundary_offset() {
        let mut printer = StreamPrinter::new();
        printer.delta("a");
        // Offset 1 falls inside "é" of a different text: print it whole
        assert_eq!(printer.delta("é"), "é");
    }
}

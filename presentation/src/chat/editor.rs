//! Prompt line editing
//!
//! rustyline blocks its thread while it reads, so the editor lives on a
//! blocking task. The REPL asks for one line at a time and awaits the answer
//! on a channel, which keeps the wait usable inside `select!`.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What one prompt produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    Line(String),
    /// Ctrl-C at the prompt
    Interrupted,
    /// Ctrl-D, closed input, or a broken terminal
    Eof,
}

/// A blocking source of prompt lines
pub trait LineReader {
    fn read(&mut self, prompt: &str) -> ReadEvent;

    /// Called once when the editor shuts down
    fn finish(&mut self) {}
}

/// rustyline editor with file-backed history
pub struct RustylineReader {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
}

impl RustylineReader {
    pub fn new(history_path: Option<PathBuf>) -> rustyline::Result<Self> {
        let mut editor = DefaultEditor::new()?;

        if let Some(ref path) = history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            // A missing file is the normal first run
            let _ = editor.load_history(path);
        }

        Ok(Self {
            editor,
            history_path,
        })
    }

    /// `<data_dir>/parley/history.txt`
    pub fn default_history_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("parley").join("history.txt"))
    }
}

impl LineReader for RustylineReader {
    fn read(&mut self, prompt: &str) -> ReadEvent {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let entry = line.trim();
                if !entry.is_empty() {
                    let _ = self.editor.add_history_entry(entry);
                }
                ReadEvent::Line(line)
            }
            Err(ReadlineError::Interrupted) => ReadEvent::Interrupted,
            Err(ReadlineError::Eof) => ReadEvent::Eof,
            Err(e) => {
                warn!("Line editor failed: {}", e);
                ReadEvent::Eof
            }
        }
    }

    fn finish(&mut self) {
        if let Some(ref path) = self.history_path
            && let Err(e) = self.editor.save_history(path)
        {
            warn!("Could not save history to {}: {}", path.display(), e);
        }
    }
}

/// Async handle on a [`LineReader`] running on a blocking task
pub struct LineEditor {
    requests: mpsc::Sender<String>,
    events: mpsc::Receiver<ReadEvent>,
    worker: JoinHandle<()>,
}

impl LineEditor {
    /// Start the worker. The reader is built on the worker thread, so it
    /// does not have to be `Send`.
    pub fn spawn<R, E, F>(make_reader: F) -> Self
    where
        R: LineReader,
        E: std::fmt::Display,
        F: FnOnce() -> Result<R, E> + Send + 'static,
    {
        let (requests, mut request_rx) = mpsc::channel::<String>(1);
        let (event_tx, events) = mpsc::channel(1);

        let worker = tokio::task::spawn_blocking(move || {
            let mut reader = match make_reader() {
                Ok(reader) => reader,
                Err(e) => {
                    warn!("Could not start the line editor: {}", e);
                    return;
                }
            };

            while let Some(prompt) = request_rx.blocking_recv() {
                let event = reader.read(&prompt);
                let at_end = event == ReadEvent::Eof;
                if event_tx.blocking_send(event).is_err() || at_end {
                    break;
                }
            }

            reader.finish();
            debug!("Line editor stopped");
        });

        Self {
            requests,
            events,
            worker,
        }
    }

    /// Ask for the next line. Pair each call with one [`LineEditor::next_event`].
    pub async fn request(&self, prompt: &str) {
        // A stopped worker shows up as Eof in next_event
        let _ = self.requests.send(prompt.to_string()).await;
    }

    /// Wait for the answer to the last request. Cancel safe.
    pub async fn next_event(&mut self) -> ReadEvent {
        self.events.recv().await.unwrap_or(ReadEvent::Eof)
    }

    /// Stop the worker and let the reader save its state.
    pub async fn close(self) {
        let Self {
            requests, worker, ..
        } = self;
        drop(requests);
        if let Err(e) = worker.await {
            warn!("Line editor task failed: {}", e);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays fixed events and records what it was asked
    #[derive(Default)]
    pub(crate) struct ScriptedReader {
        events: VecDeque<ReadEvent>,
        pub(crate) log: Arc<Mutex<ReaderLog>>,
    }

    #[derive(Debug, Default)]
    pub(crate) struct ReaderLog {
        pub(crate) prompts: Vec<String>,
        pub(crate) finished: bool,
    }

    impl ScriptedReader {
        pub(crate) fn lines(lines: &[&str]) -> Self {
            Self::events(lines.iter().map(|l| ReadEvent::Line(l.to_string())).collect())
        }

        pub(crate) fn events(events: Vec<ReadEvent>) -> Self {
            Self {
                events: events.into(),
                log: Arc::default(),
            }
        }
    }

    impl LineReader for ScriptedReader {
        fn read(&mut self, prompt: &str) -> ReadEvent {
            self.log.lock().unwrap().prompts.push(prompt.to_string());
            self.events.pop_front().unwrap_or(ReadEvent::Eof)
        }

        fn finish(&mut self) {
            self.log.lock().unwrap().finished = true;
        }
    }
}

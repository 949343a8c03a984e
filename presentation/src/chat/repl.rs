//! REPL (Read-Eval-Print Loop) for interactive chat

use super::editor::{LineEditor, ReadEvent, RustylineReader};
use crate::config::ReplConfig;
use crate::output::console::ConsoleFormatter;
use colored::Colorize;
use parley_application::{SessionEngine, SessionError, SubmitOutcome};
use parley_domain::{Conversation, ConversationId, Message, Role};
use tokio::time::Instant;
use tracing::debug;

const PROMPT: &str = ">>> ";
const IDLE_INTERRUPT_HINT: &str = "(nothing to stop; /quit or Ctrl-D to exit)";

/// A slash command typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    New,
    List,
    Switch(String),
    Delete(String),
    History,
    /// Copy the n-th most recent assistant answer (1 = latest)
    Copy(usize),
    Status,
    Help,
    Quit,
    MissingArgument(&'static str),
    Unknown(String),
}

impl ReplCommand {
    /// Parse a prompt line. Returns `None` for anything that is not a
    /// slash command, i.e. a question.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let rest = line.strip_prefix('/')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "new" | "n" => ReplCommand::New,
            "list" | "ls" => ReplCommand::List,
            "switch" | "s" if arg.is_empty() => ReplCommand::MissingArgument("/switch <n|id>"),
            "switch" | "s" => ReplCommand::Switch(arg.to_string()),
            "delete" | "rm" if arg.is_empty() => ReplCommand::MissingArgument("/delete <n|id>"),
            "delete" | "rm" => ReplCommand::Delete(arg.to_string()),
            "history" => ReplCommand::History,
            "copy" | "cp" if arg.is_empty() => ReplCommand::Copy(1),
            "copy" | "cp" => match arg.parse::<usize>() {
                Ok(n) if n > 0 => ReplCommand::Copy(n),
                _ => ReplCommand::MissingArgument("/copy [n]"),
            },
            "status" => ReplCommand::Status,
            "help" | "h" | "?" => ReplCommand::Help,
            "quit" | "exit" | "q" => ReplCommand::Quit,
            _ => ReplCommand::Unknown(line.to_string()),
        };
        Some(command)
    }
}

/// Resolve a `/switch` or `/delete` argument: a 1-based position in the
/// list, or a conversation id.
pub(crate) fn resolve_target(arg: &str, conversations: &[Conversation]) -> Option<ConversationId> {
    if let Ok(position) = arg.parse::<usize>()
        && (1..=conversations.len()).contains(&position)
    {
        return Some(conversations[position - 1].id().clone());
    }
    conversations
        .iter()
        .find(|c| c.id().as_str() == arg)
        .map(|c| c.id().clone())
}

/// The n-th most recent non-empty assistant answer, 1-based.
pub(crate) fn answer_to_copy(messages: &[Message], n: usize) -> Option<&str> {
    messages
        .iter()
        .rev()
        .filter(|m| m.role == Role::Assistant && !m.content.is_empty())
        .nth(n.checked_sub(1)?)
        .map(|m| m.content.as_str())
}

/// Interactive chat REPL
pub struct ChatRepl {
    engine: SessionEngine,
    config: ReplConfig,
    // Held for the whole session; on X11 the copied text lives only as long as this
    clipboard: Option<arboard::Clipboard>,
}

impl ChatRepl {
    /// Create a new ChatRepl over a ready engine
    pub fn new(engine: SessionEngine) -> Self {
        Self {
            engine,
            config: ReplConfig::default(),
            clipboard: None,
        }
    }

    pub fn with_config(mut self, config: ReplConfig) -> Self {
        self.config = config;
        self
    }

    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    /// Run the interactive REPL until `/quit` or end of input
    pub async fn run(&mut self) {
        let history = self.config.history_file.clone();
        let editor = LineEditor::spawn(move || RustylineReader::new(history));
        self.run_with(editor).await;
    }

    pub(crate) async fn run_with(&mut self, mut editor: LineEditor) {
        if self.config.show_welcome {
            print!("{}", ConsoleFormatter::welcome(&self.config.endpoint));
            if let Some(active) = self.engine.repository().active() {
                println!("{} {}", "Conversation:".dimmed(), active.name());
            }
            println!();
        }

        loop {
            let Some(line) = self.next_line(&mut editor).await else {
                println!();
                println!("Bye!");
                break;
            };
            let line = line.trim();

            // Skip empty lines
            if line.is_empty() {
                continue;
            }

            if let Some(command) = ReplCommand::parse(line) {
                if self.handle_command(command) {
                    break;
                }
                continue;
            }

            self.process_question(line).await;
        }

        // Saves the prompt history
        editor.close().await;
    }

    /// Wait for the next input line while applying the timed error
    /// recovery, so the engine returns to idle without user action.
    async fn next_line(&mut self, editor: &mut LineEditor) -> Option<String> {
        editor.request(PROMPT).await;
        loop {
            let recovery = self.engine.recovery_deadline();
            tokio::select! {
                event = editor.next_event() => match event {
                    ReadEvent::Line(line) => return Some(line),
                    ReadEvent::Eof => return None,
                    ReadEvent::Interrupted => {
                        println!("{}", IDLE_INTERRUPT_HINT.dimmed());
                        editor.request(PROMPT).await;
                    }
                },
                // Piped input has no raw mode, so Ctrl-C arrives as a signal
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    println!("{}", IDLE_INTERRUPT_HINT.dimmed());
                }
                _ = sleep_until_some(recovery) => {
                    if self.engine.poll_recovery(Instant::now()) {
                        debug!("Recovered from error while waiting for input");
                    }
                }
            }
        }
    }

    /// Handle slash commands. Returns true if should exit.
    fn handle_command(&mut self, command: ReplCommand) -> bool {
        match command {
            ReplCommand::Quit => {
                println!("Bye!");
                return true;
            }
            ReplCommand::Help => Self::print_help(),
            ReplCommand::New => match self.engine.create_conversation() {
                Ok(conversation) => println!("Started {}", conversation.name().bold()),
                Err(e) => Self::report(&e),
            },
            ReplCommand::List => print!(
                "{}",
                ConsoleFormatter::conversation_list(
                    self.engine.conversations(),
                    self.engine.active_id()
                )
            ),
            ReplCommand::Switch(arg) => self.switch_to(&arg),
            ReplCommand::Delete(arg) => self.delete(&arg),
            ReplCommand::History => {
                print!("{}", ConsoleFormatter::history(self.engine.active_messages()))
            }
            ReplCommand::Copy(n) => self.copy_answer(n),
            ReplCommand::Status => print!(
                "{}",
                ConsoleFormatter::status(
                    self.engine.state(),
                    &self.engine.signals(),
                    self.engine.repository().active()
                )
            ),
            ReplCommand::MissingArgument(usage) => println!("Usage: {}", usage),
            ReplCommand::Unknown(line) => {
                println!("Unknown command: {}", line);
                println!("Type /help for available commands");
            }
        }
        false
    }

    fn switch_to(&mut self, arg: &str) {
        let Some(id) = resolve_target(arg, self.engine.conversations()) else {
            println!("No conversation matches '{}'", arg);
            return;
        };
        match self.engine.select_conversation(&id) {
            Ok(messages) => {
                let history = ConsoleFormatter::history(messages);
                if let Some(active) = self.engine.repository().active() {
                    println!("Switched to {}", active.name().bold());
                }
                print!("{}", history);
            }
            Err(e) => Self::report(&e),
        }
    }

    fn delete(&mut self, arg: &str) {
        let Some(id) = resolve_target(arg, self.engine.conversations()) else {
            println!("No conversation matches '{}'", arg);
            return;
        };
        match self.engine.delete_conversation(&id) {
            Ok(()) => {
                println!("Deleted {}", id);
                if let Some(active) = self.engine.repository().active() {
                    println!("Now in {}", active.name().bold());
                }
            }
            Err(e) => Self::report(&e),
        }
    }

    fn copy_answer(&mut self, n: usize) {
        let Some(text) = answer_to_copy(self.engine.active_messages(), n).map(str::to_string)
        else {
            println!("No assistant answer to copy");
            return;
        };
        match self.copy_to_clipboard(&text) {
            Ok(()) => println!("{}", "Copied to clipboard".dimmed()),
            Err(e) => {
                // Headless sessions get the raw text to copy by hand
                debug!("Clipboard unavailable: {}", e);
                println!("{}", text);
            }
        }
    }

    fn copy_to_clipboard(&mut self, text: &str) -> Result<(), arboard::Error> {
        if self.clipboard.is_none() {
            self.clipboard = Some(arboard::Clipboard::new()?);
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            clipboard.set_text(text.to_owned())?;
        }
        Ok(())
    }

    async fn process_question(&mut self, question: &str) {
        let token = self.engine.cancel_token();
        let result = {
            let submit = self.engine.submit(question);
            tokio::pin!(submit);
            tokio::select! {
                result = &mut submit => result,
                _ = tokio::signal::ctrl_c() => {
                    token.cancel();
                    submit.await
                }
            }
        };

        match result {
            Ok(SubmitOutcome::Cancelled { partial, .. }) if partial.is_empty() => {
                println!("{}", "(cancelled)".dimmed());
            }
            Ok(SubmitOutcome::Cancelled { .. }) => println!("{}", "(stopped)".dimmed()),
            Ok(_) => {}
            Err(e) => Self::report(&e),
        }
    }

    fn report(error: &SessionError) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    fn print_help() {
        println!();
        println!("Commands:");
        println!("  /new             - Start a new conversation");
        println!("  /list            - List conversations");
        println!("  /switch <n|id>   - Switch to a conversation");
        println!("  /delete <n|id>   - Delete a conversation");
        println!("  /history         - Show the active conversation");
        println!("  /copy [n]        - Copy the n-th latest answer (default 1)");
        println!("  /status          - Show session state");
        println!("  /help, /h, /?    - Show this help");
        println!("  /quit, /exit, /q - Exit chat");
        println!();
        println!("Ctrl-C stops the answer being streamed.");
        println!();
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

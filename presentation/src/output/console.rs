//! Console output formatter for conversations and session status

use colored::Colorize;
use parley_domain::{
    Conversation, ConversationId, ErrorInfo, Message, Role, SessionSignals, SessionState, preview,
};

use crate::avatar::animation_for;

/// Formats conversations and session state for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Force colored output on or off for the whole process.
    pub fn set_color(enabled: bool) {
        colored::control::set_override(enabled);
    }

    pub fn welcome(endpoint: &str) -> String {
        let line = "─".repeat(45);
        let mut output = String::new();
        output.push_str(&format!("\n{}\n", line.cyan()));
        output.push_str(&format!("{:^45}\n", "parley - Chat Mode".bold()));
        output.push_str(&format!("{}\n\n", line.cyan()));
        output.push_str(&format!("{} {}\n", "Endpoint:".dimmed(), endpoint));
        output.push_str(&format!(
            "{}\n",
            "Type a question, /help for commands, Ctrl-C to stop an answer.".dimmed()
        ));
        output
    }

    /// Numbered list of conversations, the active one marked with `*`.
    pub fn conversation_list(
        conversations: &[Conversation],
        active_id: Option<&ConversationId>,
    ) -> String {
        if conversations.is_empty() {
            return format!("{}\n", "No conversations yet.".dimmed());
        }

        let mut output = String::new();
        for (index, conversation) in conversations.iter().enumerate() {
            let is_active = active_id == Some(conversation.id());
            let marker = if is_active { "*" } else { " " };
            let name = if is_active {
                conversation.name().bold().to_string()
            } else {
                conversation.name().to_string()
            };
            output.push_str(&format!(
                "{} {:>2}. {} {}\n",
                marker.green(),
                index + 1,
                name,
                format!(
                    "({} messages, id {})",
                    conversation.messages().len(),
                    conversation.id()
                )
                .dimmed()
            ));
        }
        output
    }

    /// Transcript of a conversation's messages.
    pub fn history(messages: &[Message]) -> String {
        if messages.is_empty() {
            return format!("{}\n", "(empty conversation)".dimmed());
        }

        let mut output = String::new();
        for message in messages {
            output.push_str(&Self::role_label(message.role));
            output.push(' ');
            output.push_str(&message.content);
            output.push('\n');
        }
        output
    }

    pub fn role_label(role: Role) -> String {
        match role {
            Role::User => "you:".blue().bold().to_string(),
            Role::Assistant => "assistant:".magenta().bold().to_string(),
        }
    }

    pub fn status(state: SessionState, signals: &SessionSignals, active: Option<&Conversation>) -> String {
        let mut output = String::new();
        output.push_str(&format!("{} {:?}\n", "State:".cyan().bold(), state));
        output.push_str(&format!(
            "{} {}\n",
            "Loading:".cyan().bold(),
            signals.is_loading
        ));
        output.push_str(&format!(
            "{} {} ({})\n",
            "Avatar:".cyan().bold(),
            signals.animation_cue,
            animation_for(signals.animation_cue)
        ));
        if let Some(conversation) = active {
            output.push_str(&format!(
                "{} {} ({} messages)\n",
                "Conversation:".cyan().bold(),
                preview(conversation.name(), 60),
                conversation.messages().len()
            ));
        }
        if let Some(error) = &signals.last_error {
            output.push_str(&format!("{} {}\n", "Last error:".red().bold(), error));
        }
        output
    }

    pub fn error(info: &ErrorInfo) -> String {
        format!("{} {}", "Error:".red().bold(), info.message)
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

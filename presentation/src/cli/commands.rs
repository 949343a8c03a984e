//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for parley
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about = "Terminal chat client for a streaming assistant endpoint")]
#[command(long_about = r#"
Parley sends each question to the assistant endpoint and prints the answer
as it streams in. Conversations are stored locally and restored on the
next start.

Without a question, parley starts an interactive chat. With a question, it
asks once in the active conversation, prints the answer and exits.

Configuration files are loaded from (in priority order):
1. PARLEY_* env vars   e.g. PARLEY_ENDPOINT__BASE_URL
2. --config <path>     Explicit config file
3. ./parley.toml       Project-level config
4. ~/.config/parley/config.toml   Global config

Example:
  parley
  parley "What changed in the last release?"
  parley --endpoint http://10.0.0.5:8000 --health
"#)]
pub struct Cli {
    /// Ask a single question and exit (starts interactive chat when omitted)
    pub question: Option<String>,

    /// Endpoint base URL, overriding the configured one
    #[arg(short, long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Conversations file, overriding the configured one
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Check that the endpoint is reachable and exit
    #[arg(long)]
    pub health: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Write logs to stderr even in interactive mode
    #[arg(long)]
    pub log_stderr: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and the effective configuration, then exit
    #[arg(long)]
    pub show_config: bool,
}

impl Cli {
    /// Interactive chat is the default when no question is given.
    pub fn is_interactive(&self) -> bool {
        self.question.is_none() && !self.health && !self.show_config
    }

    /// Tracing filter directive for the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_question_is_interactive() {
        let cli = Cli::parse_from(["parley"]);
        assert!(cli.is_interactive());
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_one_shot_question() {
        let cli = Cli::parse_from(["parley", "-vv", "--endpoint", "http://h:1", "hello there"]);
        assert!(!cli.is_interactive());
        assert_eq!(cli.question.as_deref(), Some("hello there"));
        assert_eq!(cli.endpoint.as_deref(), Some("http://h:1"));
        assert_eq!(cli.log_level(), "debug");
    }

    #[test]
    fn test_health_is_not_interactive() {
        let cli = Cli::parse_from(["parley", "--health", "-vvvv"]);
        assert!(!cli.is_interactive());
        assert_eq!(cli.log_level(), "trace");
    }
}

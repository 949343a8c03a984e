//! CLI entrypoint for parley
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use parley_application::{ConversationRepository, SessionEngine, SubmitOutcome, SystemClock};
use parley_infrastructure::{
    ConfigLoader, FileConfig, HttpQueryClient, JsonFileConversationStore, JsonlConversationLogger,
};
use parley_presentation::{ChatRepl, Cli, ConsoleFormatter, ConsoleObserver, ReplConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let _log_guard = init_logging(&cli);
    info!("Starting parley {}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(&cli)?;

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        println!();
        println!("Effective configuration:");
        println!("{}", ConfigLoader::render(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    // CLI flags override every config source
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint.base_url = endpoint.clone();
    }

    let issues = config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            error!("{}", issue);
            eprintln!("config: {}", issue);
        }
        bail!("Invalid configuration ({} issue(s))", issues.len());
    }

    ConsoleFormatter::set_color(config.output.color && !cli.no_color);

    // === Dependency Injection ===
    let client = Arc::new(HttpQueryClient::new(
        config.endpoint.base_url.clone(),
        config.endpoint.connect_timeout(),
    )?);

    if cli.health {
        client
            .health()
            .await
            .with_context(|| format!("{} is not healthy", client.base_url()))?;
        println!("{} is healthy", client.base_url());
        return Ok(ExitCode::SUCCESS);
    }

    let store_path = cli
        .store
        .clone()
        .unwrap_or_else(|| config.storage.resolve_path());
    info!("Using conversation store {}", store_path.display());
    let store = Arc::new(JsonFileConversationStore::new(store_path));

    let mut repository = ConversationRepository::new(store, Arc::new(SystemClock));
    repository
        .bootstrap()
        .context("Failed to initialise conversations")?;

    let mut engine = SessionEngine::new(repository, client)
        .with_observer(Arc::new(ConsoleObserver::new(!cli.quiet)))
        .with_config(config.session.to_session_config());

    if let Some(path) = config.logging.resolve_transcript_path() {
        match JsonlConversationLogger::new(&path) {
            Some(logger) => {
                info!("Writing transcript to {}", logger.path().display());
                engine = engine.with_conversation_logger(Arc::new(logger));
            }
            None => warn!("Transcript disabled: {} is not writable", path.display()),
        }
    }

    match cli.question {
        Some(question) => ask_once(engine, &question).await,
        None => {
            let mut repl = ChatRepl::new(engine).with_config(ReplConfig {
                show_welcome: !cli.quiet,
                endpoint: config.endpoint.base_url.clone(),
                ..ReplConfig::default()
            });
            repl.run().await;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    if cli.no_config {
        return Ok(ConfigLoader::load_defaults());
    }
    ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow!("Failed to load configuration: {}", e))
}

/// Initialize logging based on verbosity level.
///
/// Interactive chat logs to a file so log lines do not interleave with the
/// streamed answer; every other mode logs to stderr.
fn init_logging(cli: &Cli) -> Option<WorkerGuard> {
    let filter = if cli.verbose > 0 {
        EnvFilter::new(cli.log_level())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    if cli.is_interactive()
        && !cli.log_stderr
        && let Some(dir) = log_dir().filter(|dir| std::fs::create_dir_all(dir).is_ok())
    {
        let appender = tracing_appender::rolling::never(dir, "parley.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(writer)
            .init();
        return Some(guard);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    None
}

fn log_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("parley").join("logs"))
}

/// Single question mode: ask in the active conversation and exit.
async fn ask_once(mut engine: SessionEngine, question: &str) -> Result<ExitCode> {
    match engine.submit(question).await? {
        SubmitOutcome::Completed { conversation, content } => {
            info!("Answered in {} ({} bytes)", conversation, content.len());
            Ok(ExitCode::SUCCESS)
        }
        // The observer has already reported the failure on stderr
        SubmitOutcome::Failed(_) | SubmitOutcome::Cancelled { .. } => Ok(ExitCode::FAILURE),
        SubmitOutcome::Ignored => bail!("Question is empty"),
    }
}

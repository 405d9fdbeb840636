//! Structa CLI — entry point.
//!
//! # Commands
//!
//! - `structa chat [-m MESSAGE] [-s SESSION] [--model MODEL] [--logs]` — single-shot or REPL
//! - `structa history list` — list stored conversations
//! - `structa history clear -s SESSION` — reset one conversation

mod helpers;
mod repl;
mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use structa_core::config::load_config;
use structa_core::history::HistoryStore;

use session::ChatSession;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Structa — structured tool-calling agent over any chat completion model
#[derive(Parser)]
#[command(name = "structa", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent (single-shot or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Session key the history is stored under
        #[arg(short, long, default_value = "cli:default")]
        session: String,

        /// Model override (e.g. "ollama/mistral", "gpt-4o-mini")
        #[arg(long)]
        model: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Inspect or reset stored conversations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List stored conversations
    List,
    /// Reset a conversation to empty
    Clear {
        #[arg(short, long, default_value = "cli:default")]
        session: String,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            message,
            session,
            model,
            logs,
        } => {
            init_logging(logs);
            run_chat(message, session, model).await
        }
        Commands::History { action } => {
            init_logging(false);
            run_history(action)
        }
    }
}

async fn run_chat(message: Option<String>, session_key: String, model: Option<String>) -> Result<()> {
    let mut config = load_config(None);
    if let Some(model) = model {
        config.agent.model = model;
    }
    let mut session = ChatSession::from_config(&config, &session_key)?;

    match message {
        Some(msg) => {
            info!(session = %session_key, "processing single message");
            let outcome = session
                .send(&msg)
                .await
                .context("agent processing failed")?;
            helpers::print_outcome(&outcome);
        }
        None => repl::run(&mut session).await?,
    }
    Ok(())
}

fn run_history(action: HistoryCommands) -> Result<()> {
    let store = HistoryStore::new(None).context("failed to open history directory")?;
    match action {
        HistoryCommands::List => {
            let summaries = store.list();
            if summaries.is_empty() {
                println!("{}", "No stored conversations.".dimmed());
            }
            for summary in summaries {
                println!(
                    "{:<24} {:>4} messages  updated {}",
                    summary.key.bold(),
                    summary.message_count,
                    summary.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        HistoryCommands::Clear { session } => {
            store
                .clear(&session)
                .with_context(|| format!("failed to clear history '{session}'"))?;
            println!("Cleared history '{}'.", session);
        }
    }
    Ok(())
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_target(false)
        .compact()
        .init();
}

/// `--logs` turns on debug output for the structa crates. Without it only
/// warnings pass, plus the prompt/history dump the agent config asks for.
fn log_filter(verbose: bool) -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::EnvFilter;

    if verbose {
        EnvFilter::new("structa=debug,info")
    } else {
        EnvFilter::new(format!("warn,{}=info", structa_agent::PROMPT_LOG_TARGET))
    }
}

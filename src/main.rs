//! Gale CLI entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use gale::api::{self, AppState};
use gale::config::Config;
use gale::{mailbox, runtime, ui};

const DEFAULT_PROMPT: &str = "What is the weather like in Boston right now?";

#[derive(Parser)]
#[command(name = "gale")]
#[command(about = "Gale - Gemini tool-calling agent with planner/executor and router modes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one prompt with the configured agent mode
    Ask {
        /// Prompt words; joined with spaces
        prompt: Vec<String>,
    },

    /// Start the HTTP API
    Serve {
        /// Bind address (defaults to API_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port (defaults to API_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect planner/executor traces
    Mailbox {
        /// List recent threads
        #[arg(long)]
        list: bool,

        /// Show every message of one thread
        #[arg(long)]
        thread_id: Option<String>,

        /// Number of threads to list
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Mailbox file (defaults to MAILBOX_FILE)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Show Gale status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Ask { prompt } => {
            runtime::configure_logging(&config)?;
            let (runner, mode) = runtime::build_runner(&config)?;
            tracing::info!(mode = %mode, "CLI started");

            let prompt = if prompt.is_empty() {
                DEFAULT_PROMPT.to_string()
            } else {
                prompt.join(" ")
            };

            match runner.run(&prompt).await {
                Ok(response) => ui::print_response(&response),
                Err(e) => {
                    tracing::error!(error = %e, "Agent run failed");
                    ui::print_error(&format!("Agent execution failed: {}", e));
                    return Err(e.into());
                }
            }
        }

        Commands::Serve { host, port } => {
            runtime::configure_logging(&config)?;
            let (runner, mode) = runtime::build_runner(&config)?;

            let host = host.unwrap_or_else(|| config.api_host.clone());
            let port = port.unwrap_or(config.api_port);

            ui::print_header(&config.model, mode);
            ui::print_success(&format!("Listening on http://{}:{}", host, port));

            let state = Arc::new(AppState::new(runner, mode.as_str(), config.model.clone()));
            api::serve(&host, port, state).await?;
        }

        Commands::Mailbox {
            list,
            thread_id,
            limit,
            file,
        } => {
            let path = file.unwrap_or_else(|| config.mailbox_file.clone());
            if !path.exists() {
                ui::print_warning(&format!("Mailbox file not found: {}", path.display()));
                return Ok(());
            }

            let mailbox = mailbox::open(&path)?;
            if list || thread_id.is_none() {
                ui::print_threads(&mailbox.threads(limit)?);
            }
            if let Some(thread_id) = thread_id {
                ui::print_thread(&thread_id, &mailbox.thread_messages(&thread_id)?);
            }
        }

        Commands::Status => {
            ui::print_status(&config);
        }
    }

    Ok(())
}

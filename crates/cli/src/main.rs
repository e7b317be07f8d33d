//! Rulecraft CLI: the main entry point.
//!
//! Commands:
//! - `onboard`  : Write a default config file
//! - `chat`     : Talk to the assistant interactively
//! - `generate` : Run structured commands and print the resulting program
//! - `status`   : Show configuration and what the assistant knows about

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "rulecraft",
    about = "Rulecraft: turn what you say into automation programs",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Onboard,

    /// Chat with the assistant
    Chat {
        /// Do not contact the parsing service; only structured commands
        /// (`\c <json>`) and quick answers are understood
        #[arg(long)]
        offline: bool,
    },

    /// Run a structured command, answering follow-up questions in order
    Generate {
        /// The command, as JSON (e.g. `{"action":{"kind":"builtin","channel":"say"}}`)
        command: String,

        /// Follow-up answers, as JSON commands; a text question also
        /// takes the answer as plain text
        #[arg(short, long = "answer")]
        answers: Vec<String>,
    },

    /// Show configuration status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat { offline } => commands::chat::run(offline).await?,
        Commands::Generate { command, answers } => {
            commands::generate::run(&command, &answers).await?
        }
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}

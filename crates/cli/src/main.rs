//! warmloop CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: write a default config and a skills directory
//! - `agent`: interactive chat or single-message mode
//! - `skills`: list or inspect knowledge packages
//! - `doctor`: diagnose configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "warmloop",
    about = "warmloop: a coding agent that keeps the prompt cache warm",
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
    /// Initialize configuration and a skills directory
    Onboard,

    /// Chat with the agent
    Agent {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Inspect available skills
    Skills {
        #[command(subcommand)]
        action: Option<SkillsAction>,
    },

    /// Diagnose configuration and environment
    Doctor,
}

#[derive(Subcommand)]
enum SkillsAction {
    /// List skill names and descriptions
    List,

    /// Show the body a skill load would inject
    Show {
        /// Skill name
        name: String,
    },
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
        Commands::Agent { message } => commands::agent::run(message).await?,
        Commands::Skills { action } => match action {
            None | Some(SkillsAction::List) => commands::skills::list().await?,
            Some(SkillsAction::Show { name }) => commands::skills::show(&name).await?,
        },
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}

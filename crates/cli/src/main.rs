//! cypherchat CLI: the main entry point.
//!
//! Commands:
//! - `serve`: start the HTTP API (`/health`, `/ask`)
//! - `chat`: ask questions from the terminal, printing the reasoning as it streams
//! - `schema`: print the graph schema the agent is given

use clap::{Parser, Subcommand};
use tracing::{debug, info};

mod commands;

#[derive(Parser)]
#[command(
    name = "cypherchat",
    about = "Ask questions of a Neo4j knowledge graph",
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
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the graph agent
    Chat {
        /// Send a single question instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Conversation to continue
        #[arg(short, long)]
        conversation: Option<String>,
    },

    /// Print the graph schema
    Schema,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env file"),
        Err(e) => debug!(error = %e, "No .env file found"),
    }

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat {
            message,
            conversation,
        } => commands::chat::run(message, conversation).await?,
        Commands::Schema => commands::schema::run().await?,
    }

    Ok(())
}

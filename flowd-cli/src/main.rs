//! flowd-cli - Command-line interface for flowd
//!
//! Provides both a REPL and one-shot command execution.

mod commands;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use flowd_client::{Client, ConnectionConfig};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flowd-cli")]
#[command(about = "Command-line interface for the flowd workflow engine")]
#[command(version)]
struct Cli {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7420")]
    server: SocketAddr,

    /// Authentication token
    #[arg(short = 't', long, env = "FLOWD_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start interactive REPL
    Repl,

    /// Ping the server
    Ping,

    /// Get server info
    Info,

    /// Register a workflow definition
    CreateDefinition {
        /// Definition JSON (or @file.json to read from file)
        definition: String,
    },

    /// Get a workflow definition
    GetDefinition {
        /// Definition ID
        id: String,
    },

    /// List all definitions
    ListDefinitions,

    /// List the states of a definition
    ListStates {
        /// Definition ID
        id: String,
    },

    /// List the actions of a definition
    ListActions {
        /// Definition ID
        id: String,
    },

    /// Start a new workflow instance
    StartInstance {
        /// Definition ID
        definition: String,
    },

    /// Get an instance with its transition history
    GetInstance {
        /// Instance ID
        id: String,
    },

    /// List instances
    ListInstances {
        /// Filter by definition ID
        #[arg(short, long)]
        definition: Option<String>,

        /// Filter by current state ID
        #[arg(long)]
        state: Option<String>,

        /// Maximum instances to return
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Execute an action on an instance
    ExecuteAction {
        /// Instance ID
        #[arg(short, long)]
        instance: String,

        /// Action ID
        #[arg(short, long)]
        action: String,
    },

    /// Generate SHA-256 hash of a token for config files
    HashToken {
        /// The token to hash
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Handle hash-token command locally (no server connection needed)
    if let Some(Commands::HashToken { token }) = &cli.command {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        let hash = hex::encode(hasher.finalize());
        println!("{}", hash);
        return Ok(());
    }

    // Create client with optional auth token
    let mut config = ConnectionConfig::new(cli.server).with_client_name("flowd-cli");
    if let Some(ref token) = cli.token {
        config = config.with_auth_token(token);
    }
    let client = Client::new(config);

    // Handle commands
    match cli.command {
        Some(Commands::Repl) | None => {
            repl::run(client, cli.server).await?;
        }
        Some(Commands::HashToken { .. }) => unreachable!(), // Already handled above
        Some(cmd) => {
            // Connect for one-shot command
            client.connect().await.map_err(|e| {
                eprintln!("{}: {}", "Connection failed".red(), e);
                e
            })?;

            // Spawn read loop in background
            let conn = client.connection();
            tokio::spawn(async move {
                let _ = conn.read_loop().await;
            });

            // Give read_loop a chance to start
            tokio::task::yield_now().await;

            // Execute command
            let result = commands::execute(&client, cmd).await;

            match result {
                Ok(output) => {
                    println!("{}", output);
                }
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            }

            client.close().await?;
        }
    }

    Ok(())
}

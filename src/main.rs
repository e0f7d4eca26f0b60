//! flowd - Workflow Engine
//!
//! A TCP-served finite-state workflow engine: immutable definitions,
//! in-memory instances, guarded transitions with an audit history.

use flowd_core::WorkflowEngine;
use flowd_server::{Config, Server, ServerConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if FLOWD_CONFIG is set, then env overrides)
    let mut config = match Config::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var("FLOWD_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            // If a config file was explicitly specified, fail on error
            if std::env::var("FLOWD_CONFIG").is_ok() {
                tracing::error!("Failed to load config: {}", e);
                return Err(e.into());
            }
            // Otherwise fall back to defaults
            tracing::info!("Using default configuration");
            Config::default()
        }
    };

    // Load auth secrets from external file if configured
    if let Err(e) = config.load_secrets() {
        tracing::error!("Failed to load auth secrets: {}", e);
        return Err(e.into());
    }

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    tracing::info!("Starting flowd server");
    tracing::info!("  Bind address: {}", config.network.bind_addr);
    tracing::info!("  Max connections: {}", config.network.max_connections);

    if config.auth.required {
        tracing::info!(
            "  Authentication: enabled ({} token(s))",
            config.auth.token_hashes.len()
        );
    } else {
        tracing::info!("  Authentication: disabled");
    }

    // Create the workflow engine (definitions and instances live in memory)
    let engine = Arc::new(WorkflowEngine::new());

    // Configure server with auth support
    let mut server_config = ServerConfig::new(config.network.bind_addr);
    server_config.auth_required = config.auth.required;
    server_config.idle_timeout = config.network.idle_timeout();
    server_config.max_connections = config.network.max_connections;
    let server = Arc::new(Server::with_auth(server_config, engine, &config.auth));

    // Spawn shutdown signal handler
    let shutdown_server = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown_server.shutdown();
    });

    // Run server (blocks until shutdown)
    server.run().await?;

    tracing::info!("Server stopped");
    Ok(())
}

//! fillbus - tag exchange server for filling lines.
//!
//! Serves a provisioned tag table to MES / data acquisition clients over
//! the fillbus binary protocol.

use fillbus_registry::{Tag, TagRegistry};
use fillbus_server::{Config, Server};
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

    // Load configuration (from file if FILLBUS_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var("FILLBUS_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Starting fillbus server");
    tracing::info!("  Bind address: {}", config.network.bind_addr);
    tracing::info!("  Max connections: {}", config.network.max_connections);
    tracing::info!("  Provisioned tags: {}", config.tags.len());

    // Provision the tag table
    let registry = Arc::new(TagRegistry::new());
    for entry in config.tags.iter().cloned() {
        let tag: Tag = entry.into();
        tracing::debug!(
            "  tag {} \"{}\" ({}, {:?})",
            tag.id,
            tag.name,
            tag.data_type(),
            tag.access
        );
        registry.insert(tag);
    }

    let server = Arc::new(Server::bind(config.server_config(), registry)?);

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

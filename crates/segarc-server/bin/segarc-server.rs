//! segarc request server binary entry point.
//!
//! A thin wrapper around the segarc-server library that:
//! 1. Initializes logging
//! 2. Loads and validates configuration
//! 3. Serves one session over the configured pipes

use anyhow::Result;
use segarc_server::{Server, ServerConfig};

fn main() -> Result<()> {
    // Logs go to stderr; the pipes carry the protocol
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_args();

    tracing::info!(
        "Configuration loaded: request={}, response={}, shm={}",
        config.request_pipe.display(),
        config.response_pipe.display(),
        config.shm_name
    );

    let server = Server::new(config)?;
    server.run()?;

    Ok(())
}

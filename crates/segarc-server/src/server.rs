//! Server setup: configuration, channels and the session.

use crate::channel::FifoChannels;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::session::{Session, SessionEnd};
use crate::shmem::ShmProvider;
use tracing::info;

/// A configured request server
#[derive(Debug, Clone)]
pub struct Server {
    config: ServerConfig,
}

impl Server {
    /// Validate `config` and create the server
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Server configuration
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Open the channels and serve one session to completion
    ///
    /// Blocks until a client connects. The mapped file, shared memory and
    /// both pipe paths are released before this returns, including when
    /// the session fails.
    pub fn run(&self) -> Result<SessionEnd> {
        let channels = FifoChannels::open(&self.config.request_pipe, &self.config.response_pipe)?;
        let provider = ShmProvider::new(self.config.shm_name.clone());
        info!(shm = provider.name(), "Client connected");
        let mut session = Session::new(
            channels.request(),
            channels.response(),
            provider,
            self.config.variant,
        );
        let end = session.run()?;
        info!(?end, "Session finished");
        Ok(end)
    }
}

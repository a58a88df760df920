//! Server configuration management.
//!
//! Every setting can be given as a CLI argument or an environment variable,
//! and falls back to the defaults the protocol's clients expect.
//!
//! # Example
//!
//! ```no_run
//! use segarc_server::ServerConfig;
//!
//! let config = ServerConfig::from_args();
//! config.validate().expect("Invalid configuration");
//!
//! println!("Requests from {}", config.request_pipe.display());
//! ```

use crate::error::ConfigError;
use clap::Parser;
use std::path::PathBuf;

/// Default request pipe, created by the client
pub const DEFAULT_REQUEST_PIPE: &str = "REQ_PIPE_75664";

/// Default response pipe, created by the server
pub const DEFAULT_RESPONSE_PIPE: &str = "RESP_PIPE_75664";

/// Default POSIX shared memory name for the output buffer
pub const DEFAULT_SHM_NAME: &str = "/yTJuDV";

/// Default variant number reported by `PING`
pub const DEFAULT_VARIANT: u32 = 75664;

/// Server configuration loaded from CLI args and environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "segarc-server",
    about = "FIFO request server for byte-range reads from segment archives",
    version
)]
pub struct ServerConfig {
    /// Request pipe path (must already exist)
    #[arg(long, env = "SEGARC_REQUEST_PIPE", default_value = DEFAULT_REQUEST_PIPE)]
    pub request_pipe: PathBuf,

    /// Response pipe path (created at startup)
    #[arg(long, env = "SEGARC_RESPONSE_PIPE", default_value = DEFAULT_RESPONSE_PIPE)]
    pub response_pipe: PathBuf,

    /// POSIX shared memory name for the output buffer
    #[arg(long, env = "SEGARC_SHM_NAME", default_value = DEFAULT_SHM_NAME)]
    pub shm_name: String,

    /// Variant number sent in the PING reply
    #[arg(long, env = "SEGARC_VARIANT", default_value_t = DEFAULT_VARIANT)]
    pub variant: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_pipe: PathBuf::from(DEFAULT_REQUEST_PIPE),
            response_pipe: PathBuf::from(DEFAULT_RESPONSE_PIPE),
            shm_name: DEFAULT_SHM_NAME.to_string(),
            variant: DEFAULT_VARIANT,
        }
    }
}

impl ServerConfig {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The shared memory name is not `/` followed by a non-empty name
    ///   without further slashes or NUL bytes
    /// - Both pipes use the same path
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason| ConfigError::InvalidShmName {
            name: self.shm_name.clone(),
            reason,
        };
        let rest = self
            .shm_name
            .strip_prefix('/')
            .ok_or_else(|| invalid("must start with '/'"))?;
        if rest.is_empty() {
            return Err(invalid("name is empty"));
        }
        if rest.contains('/') {
            return Err(invalid("must not contain further '/'"));
        }
        if rest.contains('\0') {
            return Err(invalid("must not contain NUL"));
        }

        if self.request_pipe == self.response_pipe {
            return Err(ConfigError::SamePipes(self.request_pipe.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.request_pipe, PathBuf::from("REQ_PIPE_75664"));
        assert_eq!(config.response_pipe, PathBuf::from("RESP_PIPE_75664"));
        assert_eq!(config.shm_name, "/yTJuDV");
        assert_eq!(config.variant, 75664);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_arguments() {
        let config = ServerConfig::try_parse_from([
            "segarc-server",
            "--request-pipe",
            "/tmp/req",
            "--shm-name",
            "/other",
            "--variant",
            "7",
        ])
        .unwrap();
        assert_eq!(config.request_pipe, PathBuf::from("/tmp/req"));
        assert_eq!(config.shm_name, "/other");
        assert_eq!(config.variant, 7);
    }

    #[test]
    fn test_invalid_shm_names() {
        for name in ["noslash", "/", "/a/b", "/a\0b"] {
            let config = ServerConfig {
                shm_name: name.to_string(),
                ..ServerConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidShmName { .. })),
                "{name:?}"
            );
        }
    }

    #[test]
    fn test_same_pipes_rejected() {
        let config = ServerConfig {
            response_pipe: PathBuf::from(DEFAULT_REQUEST_PIPE),
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SamePipes(_))
        ));
    }
}

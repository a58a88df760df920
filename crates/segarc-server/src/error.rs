//! Error types for the request server.
//!
//! Command failures are recoverable and turn into an `ERROR` response;
//! only [`ServerError`] ends a session.

use segarc_format::{AddressError, FormatError, OutOfBounds, SectionError};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Shared memory name is not a single `/name` component
    #[error("Invalid shared memory name '{name}': {reason}")]
    InvalidShmName {
        /// The rejected name
        name: String,
        /// Reason for invalidity
        reason: &'static str,
    },

    /// Request and response channels point at the same path
    #[error("Request and response pipes must differ: {0}")]
    SamePipes(PathBuf),
}

/// Wire-level errors while reading requests or writing responses.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A token ran past the length limit before its terminator
    #[error("Token exceeds {limit} bytes")]
    TooLong {
        /// Maximum accepted token length, terminator excluded
        limit: usize,
    },

    /// The peer closed the channel
    #[error("Channel closed by peer")]
    ChannelClosed,

    /// I/O error on a channel
    #[error("Protocol I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of a single command, reported as the command's `ERROR` token.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A resource the command needs has not been set up
    #[error("No {0} available")]
    ResourceMissing(&'static str),

    /// A requested range falls outside its source or target buffer
    #[error("Bounds violation: {0}")]
    BoundsViolation(#[from] OutOfBounds),

    /// Requested output buffer size is zero
    #[error("Output buffer size must be positive")]
    EmptyBuffer,

    /// The `MAP_FILE` path exceeded the token limit
    #[error("File path too long")]
    PathTooLong,

    /// Opening, mapping or allocating failed
    #[error("{context}: {source}")]
    IoFailure {
        /// What was being attempted
        context: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The mapped file is not a valid archive
    #[error("Archive error: {0}")]
    Archive(#[from] FormatError),

    /// Section lookup failed
    #[error("Section error: {0}")]
    Section(#[from] SectionError),

    /// Logical offset does not address section content
    #[error("Address error: {0}")]
    Address(#[from] AddressError),
}

impl CommandError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoFailure {
            context: context.into(),
            source,
        }
    }
}

/// Fatal server errors that end or prevent a session.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failed to create the response pipe
    #[error("Cannot create the response pipe {path}: {source}")]
    CreatePipe {
        /// Pipe path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Failed to open one of the pipes
    #[error("Cannot open pipe {path}: {source}")]
    OpenPipe {
        /// Pipe path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Writing to the response channel failed
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Result type for server setup and session operations
pub type Result<T> = std::result::Result<T, ServerError>;

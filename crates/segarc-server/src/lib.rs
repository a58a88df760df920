//! Request server for byte-range reads from segment archives
//!
//! A client talks to the server over two named pipes. Through them it maps
//! an input file, creates a shared memory output buffer, and asks the
//! server to copy byte ranges of the file into that buffer. Ranges can be
//! given as raw file offsets, as offsets within a numbered section, or as
//! offsets in the logical address space where each section occupies a
//! window padded to a multiple of 3072 bytes.
//!
//! # Architecture
//!
//! - **config**: CLI and environment configuration
//! - **protocol**: request decoding and response encoding
//! - **channel**: FIFO creation, opening and removal
//! - **mapped**: the read-only mapped input file
//! - **shmem**: output buffer providers, including POSIX shared memory
//! - **session**: the single-threaded command loop
//!
//! Sessions are generic over their channels and buffer provider, so they
//! run just as well over in-memory streams:
//!
//! ```rust
//! use segarc_server::{HeapProvider, Session, SessionEnd};
//! use std::io::Cursor;
//!
//! let requests = Cursor::new(b"PING!EXIT!".to_vec());
//! let mut session = Session::new(requests, Vec::new(), HeapProvider, 75664);
//! assert_eq!(session.run()?, SessionEnd::Exit);
//! assert!(session.responses().get_ref().starts_with(b"BEGIN!PING!"));
//! # Ok::<(), segarc_server::ServerError>(())
//! ```

#![warn(missing_docs)]

#[cfg(unix)]
pub mod channel;
pub mod config;
pub mod error;
pub mod mapped;
pub mod protocol;
#[cfg(unix)]
pub mod server;
pub mod session;
pub mod shmem;

#[cfg(unix)]
pub use channel::FifoChannels;
pub use config::ServerConfig;
pub use error::{CommandError, ConfigError, ProtocolError, Result, ServerError};
pub use protocol::{Command, Request, RequestReader, ResponseWriter};
#[cfg(unix)]
pub use server::Server;
pub use session::{Session, SessionEnd};
pub use shmem::{BufferProvider, HeapProvider};
#[cfg(unix)]
pub use shmem::{ShmBuffer, ShmProvider};

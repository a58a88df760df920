//! Named pipe (FIFO) channels between the server and its client.
//!
//! The client creates the request pipe; the server creates the response
//! pipe. Both paths are removed when the channels are dropped, whether the
//! session ended normally or setup failed halfway.

use crate::error::ServerError;
use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Permissions of the response pipe
const RESPONSE_PIPE_MODE: libc::mode_t = 0o644;

/// Create a FIFO at `path`
#[allow(unsafe_code)]
pub fn make_fifo(path: &Path, mode: libc::mode_t) -> io::Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    if unsafe { libc::mkfifo(c_path.as_ptr(), mode) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Removes a filesystem path when dropped
#[derive(Debug)]
pub struct PathGuard {
    path: PathBuf,
}

impl PathGuard {
    /// Take responsibility for removing `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Guarded path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed pipe"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove pipe"),
        }
    }
}

/// Open request and response pipes for one session
///
/// Field order matters: the files close before their paths are removed.
#[derive(Debug)]
pub struct FifoChannels {
    request: File,
    response: File,
    _request_path: PathGuard,
    _response_path: PathGuard,
}

impl FifoChannels {
    /// Create the response pipe and open both ends
    ///
    /// Opening blocks until the client has opened its side of each pipe:
    /// the request pipe for writing, then the response pipe for reading.
    pub fn open(request_pipe: &Path, response_pipe: &Path) -> Result<Self, ServerError> {
        make_fifo(response_pipe, RESPONSE_PIPE_MODE).map_err(|source| {
            ServerError::CreatePipe {
                path: response_pipe.to_path_buf(),
                source,
            }
        })?;
        let response_path = PathGuard::new(response_pipe);
        debug!(path = %response_pipe.display(), "Created response pipe");

        let request = File::open(request_pipe).map_err(|source| ServerError::OpenPipe {
            path: request_pipe.to_path_buf(),
            source,
        })?;
        let request_path = PathGuard::new(request_pipe);

        let response = OpenOptions::new()
            .write(true)
            .open(response_pipe)
            .map_err(|source| ServerError::OpenPipe {
                path: response_pipe.to_path_buf(),
                source,
            })?;

        info!(
            request = %request_pipe.display(),
            response = %response_pipe.display(),
            "Channels open"
        );
        Ok(Self {
            request,
            response,
            _request_path: request_path,
            _response_path: response_path,
        })
    }

    /// Request end, read-only
    pub const fn request(&self) -> &File {
        &self.request
    }

    /// Response end, write-only
    pub const fn response(&self) -> &File {
        &self.response
    }
}

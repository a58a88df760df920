//! Request/response wire format.
//!
//! Requests are a command token terminated by `'!'`, followed by the
//! command's parameters: little-endian `u32` fields, or for `MAP_FILE` a
//! second `'!'`-terminated token holding the path. Responses are
//! `<COMMAND>!SUCCESS!` or `<COMMAND>!ERROR!`, except for `PING` which
//! answers `PING!`, the variant number as a little-endian `u32`, and `PONG!`.

use crate::error::ProtocolError;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::path::PathBuf;

/// Token terminator
pub const TERMINATOR: u8 = b'!';

/// Maximum token length in bytes, terminator excluded
pub const MAX_TOKEN_LEN: usize = 249;

/// Handshake sent once the channels are open
pub const HANDSHAKE: &[u8] = b"BEGIN!";

/// Commands understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Liveness check carrying the variant number
    Ping,
    /// Create the shared output buffer
    CreateShm,
    /// Store a `u32` in the output buffer
    WriteToShm,
    /// Map an input file read-only
    MapFile,
    /// Copy a byte range of the mapped file
    ReadFromFileOffset,
    /// Copy a byte range of one section
    ReadFromFileSection,
    /// Copy a byte range addressed in the logical space
    ReadFromLogicalSpaceOffset,
    /// Release everything and end the session
    Exit,
}

impl Command {
    /// All commands
    pub const ALL: [Self; 8] = [
        Self::Ping,
        Self::CreateShm,
        Self::WriteToShm,
        Self::MapFile,
        Self::ReadFromFileOffset,
        Self::ReadFromFileSection,
        Self::ReadFromLogicalSpaceOffset,
        Self::Exit,
    ];

    /// Wire name of the command
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ping => "PING",
            Self::CreateShm => "CREATE_SHM",
            Self::WriteToShm => "WRITE_TO_SHM",
            Self::MapFile => "MAP_FILE",
            Self::ReadFromFileOffset => "READ_FROM_FILE_OFFSET",
            Self::ReadFromFileSection => "READ_FROM_FILE_SECTION",
            Self::ReadFromLogicalSpaceOffset => "READ_FROM_LOGICAL_SPACE_OFFSET",
            Self::Exit => "EXIT",
        }
    }

    /// Look up a command by its wire name
    pub fn from_token(token: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().as_bytes() == token)
    }
}

/// A fully decoded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `PING`
    Ping,
    /// `CREATE_SHM size`
    CreateShm {
        /// Buffer size in bytes
        size: u32,
    },
    /// `WRITE_TO_SHM offset value`
    WriteToShm {
        /// Byte offset in the output buffer
        offset: u32,
        /// Value stored little-endian
        value: u32,
    },
    /// `MAP_FILE path`
    MapFile {
        /// Path to map; `None` when it exceeded [`MAX_TOKEN_LEN`]
        path: Option<PathBuf>,
    },
    /// `READ_FROM_FILE_OFFSET offset len`
    ReadFromFileOffset {
        /// Byte offset in the mapped file
        offset: u32,
        /// Number of bytes to copy
        len: u32,
    },
    /// `READ_FROM_FILE_SECTION section offset len`
    ReadFromFileSection {
        /// 1-based section index
        section: u32,
        /// Byte offset in the section content
        offset: u32,
        /// Number of bytes to copy
        len: u32,
    },
    /// `READ_FROM_LOGICAL_SPACE_OFFSET offset len`
    ReadFromLogicalSpaceOffset {
        /// Logical offset
        offset: u32,
        /// Number of bytes to copy
        len: u32,
    },
    /// `EXIT`
    Exit,
}

impl Request {
    /// The command this request carries
    pub const fn command(&self) -> Command {
        match self {
            Self::Ping => Command::Ping,
            Self::CreateShm { .. } => Command::CreateShm,
            Self::WriteToShm { .. } => Command::WriteToShm,
            Self::MapFile { .. } => Command::MapFile,
            Self::ReadFromFileOffset { .. } => Command::ReadFromFileOffset,
            Self::ReadFromFileSection { .. } => Command::ReadFromFileSection,
            Self::ReadFromLogicalSpaceOffset { .. } => Command::ReadFromLogicalSpaceOffset,
            Self::Exit => Command::Exit,
        }
    }
}

/// What arrived on the request channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A known command with its parameters
    Request(Request),
    /// A token that names no command
    Unknown(Vec<u8>),
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

/// Decodes requests from a byte stream
#[derive(Debug)]
pub struct RequestReader<R> {
    inner: BufReader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Wrap a request channel
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
        }
    }

    /// Read one `'!'`-terminated token
    ///
    /// An over-long token is consumed up to its terminator before
    /// [`ProtocolError::TooLong`] is returned, so the stream stays aligned
    /// on the next token.
    pub fn read_token(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let mut token = Vec::new();
        let mut too_long = false;
        loop {
            let available = match self.inner.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if available.is_empty() {
                return Err(ProtocolError::ChannelClosed);
            }

            let (chunk, done) = match available.iter().position(|&b| b == TERMINATOR) {
                Some(end) => (&available[..end], true),
                None => (available, false),
            };
            let room = MAX_TOKEN_LEN.saturating_sub(token.len());
            if chunk.len() > room {
                too_long = true;
            }
            token.extend_from_slice(&chunk[..chunk.len().min(room)]);

            let consumed = chunk.len() + usize::from(done);
            self.inner.consume(consumed);
            if done {
                break;
            }
        }

        if too_long {
            Err(ProtocolError::TooLong {
                limit: MAX_TOKEN_LEN,
            })
        } else {
            Ok(token)
        }
    }

    /// Read a little-endian `u32` parameter
    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        let mut raw = [0u8; 4];
        self.inner.read_exact(&mut raw).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                ProtocolError::ChannelClosed
            } else {
                e.into()
            }
        })?;
        Ok(u32::from_le_bytes(raw))
    }

    /// Read the next command and its parameters
    ///
    /// A command token longer than [`MAX_TOKEN_LEN`] is returned as
    /// [`ProtocolError::TooLong`]; the caller may skip it and continue.
    pub fn read_request(&mut self) -> Result<Incoming, ProtocolError> {
        let token = self.read_token()?;
        let Some(command) = Command::from_token(&token) else {
            return Ok(Incoming::Unknown(token));
        };

        let request = match command {
            Command::Ping => Request::Ping,
            Command::CreateShm => Request::CreateShm {
                size: self.read_u32()?,
            },
            Command::WriteToShm => Request::WriteToShm {
                offset: self.read_u32()?,
                value: self.read_u32()?,
            },
            Command::MapFile => {
                let path = match self.read_token() {
                    Ok(bytes) => Some(path_from_bytes(bytes)),
                    Err(ProtocolError::TooLong { .. }) => None,
                    Err(e) => return Err(e),
                };
                Request::MapFile { path }
            }
            Command::ReadFromFileOffset => Request::ReadFromFileOffset {
                offset: self.read_u32()?,
                len: self.read_u32()?,
            },
            Command::ReadFromFileSection => Request::ReadFromFileSection {
                section: self.read_u32()?,
                offset: self.read_u32()?,
                len: self.read_u32()?,
            },
            Command::ReadFromLogicalSpaceOffset => Request::ReadFromLogicalSpaceOffset {
                offset: self.read_u32()?,
                len: self.read_u32()?,
            },
            Command::Exit => Request::Exit,
        };
        Ok(Incoming::Request(request))
    }
}

/// Encodes responses onto a byte stream
#[derive(Debug)]
pub struct ResponseWriter<W> {
    inner: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Wrap a response channel
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.inner.write_all(bytes)?;
        self.inner.flush()?;
        Ok(())
    }

    /// Send the session handshake
    pub fn handshake(&mut self) -> Result<(), ProtocolError> {
        self.send(HANDSHAKE)
    }

    /// Send the `PING` reply carrying `variant`
    pub fn pong(&mut self, variant: u32) -> Result<(), ProtocolError> {
        let mut reply = Vec::with_capacity(14);
        reply.extend_from_slice(b"PING!");
        reply.extend_from_slice(&variant.to_le_bytes());
        reply.extend_from_slice(b"PONG!");
        self.send(&reply)
    }

    /// Send `<COMMAND>!SUCCESS!` or `<COMMAND>!ERROR!`
    pub fn status(&mut self, command: Command, success: bool) -> Result<(), ProtocolError> {
        let status = if success { "SUCCESS" } else { "ERROR" };
        self.send(format!("{}!{status}!", command.name()).as_bytes())
    }

    /// The wrapped channel
    pub const fn get_ref(&self) -> &W {
        &self.inner
    }
}

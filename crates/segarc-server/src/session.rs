//! The command loop of one server session.
//!
//! A session owns at most one mapped input file and one output buffer.
//! Each request is read, validated, executed and answered before the next
//! one is read. Command failures are answered with the command's `ERROR`
//! token and never end the session; only `EXIT`, the peer closing the
//! request channel, or a failed response write do.

use crate::error::{CommandError, ProtocolError, Result};
use crate::mapped::MappedFile;
use crate::protocol::{Incoming, Request, RequestReader, ResponseWriter};
use crate::shmem::BufferProvider;
use segarc_format::{ByteView, LogicalSpace, OutOfBounds, decode, section};
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client sent `EXIT`
    Exit,
    /// The client closed the request channel
    ChannelClosed,
}

/// Whether the loop continues after a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Copy `source` to the start of `output`
fn copy_into(output: &mut [u8], source: &[u8]) -> std::result::Result<(), CommandError> {
    let out_of_bounds = OutOfBounds {
        offset: 0,
        len: source.len() as u64,
        available: output.len() as u64,
    };
    let target = output
        .get_mut(..source.len())
        .ok_or(CommandError::BoundsViolation(out_of_bounds))?;
    target.copy_from_slice(source);
    Ok(())
}

/// One client session over a request reader, a response writer and an
/// output buffer provider
pub struct Session<R, W, P: BufferProvider> {
    requests: RequestReader<R>,
    responses: ResponseWriter<W>,
    provider: P,
    variant: u32,
    mapped: Option<MappedFile>,
    output: Option<P::Buffer>,
}

impl<R, W, P: BufferProvider> std::fmt::Debug for Session<R, W, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("variant", &self.variant)
            .field("mapped", &self.mapped.as_ref().map(MappedFile::path))
            .field(
                "output_len",
                &self.output.as_ref().map(|b| b.as_ref().len()),
            )
            .finish_non_exhaustive()
    }
}

impl<R: Read, W: Write, P: BufferProvider> Session<R, W, P> {
    /// Create a session; nothing is sent until [`run`](Self::run)
    pub fn new(requests: R, responses: W, provider: P, variant: u32) -> Self {
        Self {
            requests: RequestReader::new(requests),
            responses: ResponseWriter::new(responses),
            provider,
            variant,
            mapped: None,
            output: None,
        }
    }

    /// Send the handshake and serve requests until the session ends
    ///
    /// Resources are released before returning, on every path.
    pub fn run(&mut self) -> Result<SessionEnd> {
        let result = self.serve();
        self.release();
        result
    }

    fn serve(&mut self) -> Result<SessionEnd> {
        self.responses.handshake()?;
        info!(variant = self.variant, "Session started");

        loop {
            let request = match self.requests.read_request() {
                Ok(Incoming::Request(request)) => request,
                Ok(Incoming::Unknown(token)) => {
                    warn!(token = %String::from_utf8_lossy(&token), "Ignoring unknown command");
                    continue;
                }
                Err(ProtocolError::TooLong { limit }) => {
                    warn!(limit, "Ignoring over-long command token");
                    continue;
                }
                Err(ProtocolError::ChannelClosed) => {
                    info!("Request channel closed");
                    return Ok(SessionEnd::ChannelClosed);
                }
                Err(e) => return Err(e.into()),
            };

            if self.handle(request)? == Flow::Stop {
                info!("Session ended by EXIT");
                return Ok(SessionEnd::Exit);
            }
        }
    }

    /// Execute one request and write its response
    fn handle(&mut self, request: Request) -> std::result::Result<Flow, ProtocolError> {
        let command = request.command();
        debug!(?request, "Handling request");

        let outcome = match request {
            Request::Ping => {
                self.responses.pong(self.variant)?;
                return Ok(Flow::Continue);
            }
            Request::Exit => return Ok(Flow::Stop),
            Request::CreateShm { size } => self.create_shm(size),
            Request::WriteToShm { offset, value } => self.write_to_shm(offset, value),
            Request::MapFile { path } => self.map_file(path),
            Request::ReadFromFileOffset { offset, len } => self.read_file_offset(offset, len),
            Request::ReadFromFileSection {
                section,
                offset,
                len,
            } => self.read_file_section(section, offset, len),
            Request::ReadFromLogicalSpaceOffset { offset, len } => {
                self.read_logical_offset(offset, len)
            }
        };

        if let Err(e) = &outcome {
            warn!(command = command.name(), error = %e, "Command failed");
        }
        self.responses.status(command, outcome.is_ok())?;
        Ok(Flow::Continue)
    }

    fn create_shm(&mut self, size: u32) -> std::result::Result<(), CommandError> {
        if size == 0 {
            return Err(CommandError::EmptyBuffer);
        }
        // The old buffer may share the new one's name, so release it first.
        self.output = None;
        self.output = Some(self.provider.create(size as usize)?);
        Ok(())
    }

    fn write_to_shm(&mut self, offset: u32, value: u32) -> std::result::Result<(), CommandError> {
        let output = self
            .output
            .as_mut()
            .ok_or(CommandError::ResourceMissing("shared memory"))?
            .as_mut();
        let out_of_bounds = OutOfBounds {
            offset: u64::from(offset),
            len: 4,
            available: output.len() as u64,
        };
        let start = offset as usize;
        let target = start
            .checked_add(4)
            .and_then(|end| output.get_mut(start..end))
            .ok_or(CommandError::BoundsViolation(out_of_bounds))?;
        target.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn map_file(&mut self, path: Option<PathBuf>) -> std::result::Result<(), CommandError> {
        let path = path.ok_or(CommandError::PathTooLong)?;
        // A failed mapping leaves the previous file in place.
        self.mapped = Some(MappedFile::open(&path)?);
        Ok(())
    }

    fn read_file_offset(&mut self, offset: u32, len: u32) -> std::result::Result<(), CommandError> {
        let (file, output) = self.resources()?;
        let source = ByteView::new(file.bytes()).slice(u64::from(offset), u64::from(len))?;
        copy_into(output, source)
    }

    fn read_file_section(
        &mut self,
        index: u32,
        offset: u32,
        len: u32,
    ) -> std::result::Result<(), CommandError> {
        let (file, output) = self.resources()?;
        let data = file.bytes();
        let header = decode(data)?;
        let content = section::content(&header, data, index as usize)?;
        let source = ByteView::new(content).slice(u64::from(offset), u64::from(len))?;
        copy_into(output, source)
    }

    fn read_logical_offset(&mut self, offset: u32, len: u32) -> std::result::Result<(), CommandError> {
        let (file, output) = self.resources()?;
        let data = file.bytes();
        let header = decode(data)?;
        let location = LogicalSpace::new(&header).resolve(u64::from(offset), u64::from(len))?;
        let content = section::content(&header, data, location.section + 1)?;
        let source = ByteView::new(content).slice(location.offset, u64::from(len))?;
        copy_into(output, source)
    }

    /// Mapped file and output buffer, both required by the read commands
    fn resources(&mut self) -> std::result::Result<(&MappedFile, &mut [u8]), CommandError> {
        let output = self
            .output
            .as_mut()
            .ok_or(CommandError::ResourceMissing("shared memory"))?;
        let file = self
            .mapped
            .as_ref()
            .ok_or(CommandError::ResourceMissing("mapped file"))?;
        Ok((file, output.as_mut()))
    }

    /// Release the mapped file and the output buffer, skipping whichever
    /// was never acquired
    fn release(&mut self) {
        if let Some(file) = self.mapped.take() {
            debug!(path = %file.path().display(), "Unmapping input file");
        }
        if self.output.take().is_some() {
            debug!("Released output buffer");
        }
    }

    /// Current output buffer contents
    pub fn output(&self) -> Option<&[u8]> {
        self.output.as_ref().map(AsRef::as_ref)
    }

    /// Currently mapped input file
    pub const fn mapped_file(&self) -> Option<&MappedFile> {
        self.mapped.as_ref()
    }

    /// Response writer, e.g. to inspect an in-memory channel
    pub const fn responses(&self) -> &ResponseWriter<W> {
        &self.responses
    }
}

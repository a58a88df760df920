//! Bounds-checked access to untrusted byte buffers
//!
//! Every offset and length coming from an archive is attacker controlled.
//! `ByteView` is the single place where such values turn into slice
//! indices: all arithmetic is done in `u64` with overflow checks, and a
//! read is rejected before any indexing if it would leave the buffer.

use crate::error::OutOfBounds;

/// Read-only view over an in-memory or memory-mapped buffer
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    data: &'a [u8],
}

impl<'a> ByteView<'a> {
    /// Wrap a byte slice
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Length of the underlying buffer
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether the buffer is empty
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow `len` bytes starting at `offset`
    pub fn slice(&self, offset: u64, len: u64) -> Result<&'a [u8], OutOfBounds> {
        let err = OutOfBounds {
            offset,
            len,
            available: self.len(),
        };
        let end = offset.checked_add(len).ok_or(err)?;
        if end > self.len() {
            return Err(err);
        }
        // Both values are <= data.len() here, so they fit in usize.
        Ok(&self.data[offset as usize..end as usize])
    }

    /// Borrow the last `len` bytes
    pub fn tail(&self, len: u64) -> Result<&'a [u8], OutOfBounds> {
        let offset = self.len().checked_sub(len).ok_or(OutOfBounds {
            offset: 0,
            len,
            available: self.len(),
        })?;
        self.slice(offset, len)
    }

    /// Read exactly `N` bytes at `offset`
    pub fn array<const N: usize>(&self, offset: u64) -> Result<[u8; N], OutOfBounds> {
        let bytes = self.slice(offset, N as u64)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Read a single byte
    pub fn read_u8(&self, offset: u64) -> Result<u8, OutOfBounds> {
        Ok(self.array::<1>(offset)?[0])
    }

    /// Read a little-endian `u16`
    pub fn read_u16_le(&self, offset: u64) -> Result<u16, OutOfBounds> {
        self.array(offset).map(u16::from_le_bytes)
    }

    /// Read a little-endian `u32`
    pub fn read_u32_le(&self, offset: u64) -> Result<u32, OutOfBounds> {
        self.array(offset).map(u32::from_le_bytes)
    }
}

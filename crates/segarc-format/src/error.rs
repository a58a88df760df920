//! Error types for archive decoding, extraction and addressing

use std::path::PathBuf;
use thiserror::Error;

/// Result type for header decoding
pub type Result<T> = std::result::Result<T, FormatError>;

/// A read that would fall outside the underlying byte buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Read of {len} bytes at offset {offset} exceeds buffer of {available} bytes")]
pub struct OutOfBounds {
    /// Requested start offset
    pub offset: u64,
    /// Requested length
    pub len: u64,
    /// Length of the buffer
    pub available: u64,
}

/// Errors produced while decoding the trailer and section table
///
/// Variants are listed in the order `decode` checks them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Buffer too small for a field the decoder needs to read
    #[error("Truncated archive: {field} needs {needed} bytes at offset {offset}, buffer has {available}")]
    Truncated {
        /// Field being read when the buffer ran out
        field: &'static str,
        /// Offset of the field from the start of the buffer
        offset: u64,
        /// Bytes required for the field
        needed: u64,
        /// Total bytes available
        available: u64,
    },

    /// Trailer magic does not match `Nn1J`
    #[error("Invalid magic: expected 'Nn1J', got {0:02x?}")]
    BadMagic([u8; 4]),

    /// Version outside the accepted range
    #[error("Unsupported version: {0}")]
    BadVersion(u32),

    /// Section count is neither 2 nor in 8..=14
    #[error("Invalid section count: {0}")]
    BadSectionCount(u8),

    /// A section carries a type outside the known set
    #[error("Invalid type {section_type} in section {index}")]
    BadSectionType {
        /// 1-based index of the first offending section
        index: usize,
        /// The rejected type value
        section_type: i32,
    },
}

impl FormatError {
    pub(crate) fn truncated(field: &'static str, err: OutOfBounds) -> Self {
        Self::Truncated {
            field,
            offset: err.offset,
            needed: err.len,
            available: err.available,
        }
    }
}

/// Errors produced while locating a section's content
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SectionError {
    /// Requested section index is not in `1..=section_count`
    #[error("Invalid section {index}: archive has {count} sections")]
    InvalidSection {
        /// Requested 1-based index
        index: usize,
        /// Number of sections in the archive
        count: usize,
    },

    /// Section content extends past the end of the archive
    #[error("Section {index} spans {offset}+{size} bytes but archive has {available}")]
    Truncated {
        /// 1-based section index
        index: usize,
        /// Declared content offset
        offset: u32,
        /// Declared content size
        size: u32,
        /// Archive length
        available: u64,
    },
}

/// Errors produced while selecting a line from section content
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    /// Requested line is not in `1..=line_count`
    #[error("Invalid line {line}: section has {count} lines")]
    InvalidLine {
        /// Requested 1-based line number
        line: usize,
        /// Number of lines in the content
        count: usize,
    },
}

/// Errors produced while translating logical offsets
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Offset (or offset plus length) falls outside any section's content
    #[error("Logical range {offset}+{len} is outside the mapped sections (logical length {total})")]
    OutOfRange {
        /// Requested logical offset
        offset: u64,
        /// Requested length
        len: u64,
        /// Total logical length of the archive
        total: u64,
    },
}

/// Errors produced when a directory walk cannot start
#[derive(Debug, Error)]
pub enum WalkError {
    /// The root is missing, not a directory, or not readable
    #[error("Invalid directory path {path}: {source}")]
    InvalidDirectory {
        /// Root that was requested
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Errors produced while encoding a header or building an archive
#[derive(Debug, Error)]
pub enum BuildError {
    /// Section count does not fit the one-byte count field
    #[error("Too many sections: {0} (at most 255)")]
    TooManySections(usize),

    /// Encoded header does not fit the two-byte `header_size` field
    #[error("Header too large: {0} bytes (at most 65535)")]
    HeaderTooLarge(usize),

    /// Section content does not fit the four-byte offset/size fields
    #[error("Section content too large: ends at byte {0}")]
    ContentTooLarge(u64),

    /// Binary write error
    #[error("Binary write error: {0}")]
    BinWrite(#[from] binrw::Error),
}

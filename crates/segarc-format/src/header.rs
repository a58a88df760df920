//! Trailer and section table decoding
//!
//! The header of a segment archive is found by reading backwards from the
//! end of the file:
//!
//! ```text
//! ... section content ... | version u32 | count u8 | count x SectionHeader | header_size u16 | "Nn1J"
//!                         ^ header_start = file_len - header_size
//! ```
//!
//! All integers are little-endian. Each `SectionHeader` is 19 bytes:
//! a 7-byte name, `i32` type, `u32` offset and `u32` size.

use crate::bytes::ByteView;
use crate::error::{BuildError, FormatError, OutOfBounds, Result};
use binrw::io::Cursor;
use binrw::{BinRead, BinWrite};
use std::ops::RangeInclusive;

/// Trailer magic, the last four bytes of every archive
pub const MAGIC: [u8; 4] = *b"Nn1J";

/// Size of the trailer: `header_size` (2) + magic (4)
pub const TRAILER_SIZE: u64 = 6;

/// Size of `version` (4) + `section_count` (1)
pub const FIXED_HEADER_SIZE: u64 = 5;

/// Size of one on-disk section header
pub const SECTION_HEADER_SIZE: u64 = 19;

/// Length of the fixed name field
pub const SECTION_NAME_LEN: usize = 7;

/// Accepted archive versions
pub const VERSION_RANGE: RangeInclusive<u32> = 31..=75;

/// Accepted section counts besides the special value 2
pub const SECTION_COUNT_RANGE: RangeInclusive<u8> = 8..=14;

/// Section types an archive may contain
pub const SECTION_TYPES: [i32; 5] = [13, 39, 81, 82, 90];

/// Whether `count` is an accepted section count
pub fn is_valid_section_count(count: u8) -> bool {
    count == 2 || SECTION_COUNT_RANGE.contains(&count)
}

/// Whether `section_type` is one of [`SECTION_TYPES`]
pub fn is_known_section_type(section_type: i32) -> bool {
    SECTION_TYPES.contains(&section_type)
}

/// One entry of the section table
#[derive(BinRead, BinWrite, Debug, Clone, PartialEq, Eq, Hash)]
#[brw(little)]
pub struct SectionHeader {
    /// Raw name bytes, not necessarily NUL-terminated
    pub name: [u8; SECTION_NAME_LEN],
    /// Section type, one of [`SECTION_TYPES`] in a valid archive
    pub section_type: i32,
    /// Absolute offset of the content in the archive
    pub offset: u32,
    /// Content length in bytes
    pub size: u32,
}

impl SectionHeader {
    /// Create a section header; `name` is truncated or NUL-padded to 7 bytes
    pub fn new(name: &str, section_type: i32, offset: u32, size: u32) -> Self {
        let mut raw = [0u8; SECTION_NAME_LEN];
        let bytes = name.as_bytes();
        let n = bytes.len().min(SECTION_NAME_LEN);
        raw[..n].copy_from_slice(&bytes[..n]);
        Self {
            name: raw,
            section_type,
            offset,
            size,
        }
    }

    /// Name for display: bytes up to the first NUL, lossily decoded, trailing
    /// whitespace removed
    pub fn name_str(&self) -> String {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(SECTION_NAME_LEN);
        String::from_utf8_lossy(&self.name[..end])
            .trim_end()
            .to_string()
    }

    /// Exclusive end offset of the content
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.size)
    }
}

/// Decoded archive metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Format version, within [`VERSION_RANGE`]
    pub version: u32,
    /// Section table in on-disk order
    pub sections: Vec<SectionHeader>,
}

impl Header {
    /// Decode the trailer and section table of `data`
    ///
    /// Checks run in a fixed order and the first failure is returned:
    /// truncation, magic, version, section count, section types. No byte
    /// outside `data` is ever read.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let view = ByteView::new(data);
        let len = view.len();

        let trailer = view
            .tail(TRAILER_SIZE)
            .map_err(|e| FormatError::truncated("trailer", e))?;

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&trailer[2..]);
        if magic != MAGIC {
            return Err(FormatError::BadMagic(magic));
        }

        let header_size = u64::from(u16::from_le_bytes([trailer[0], trailer[1]]));
        let header_start = len.checked_sub(header_size).ok_or_else(|| {
            FormatError::truncated(
                "header",
                OutOfBounds {
                    offset: 0,
                    len: header_size,
                    available: len,
                },
            )
        })?;

        let version = view
            .read_u32_le(header_start)
            .map_err(|e| FormatError::truncated("version", e))?;
        if !VERSION_RANGE.contains(&version) {
            return Err(FormatError::BadVersion(version));
        }

        let count = view
            .read_u8(header_start + 4)
            .map_err(|e| FormatError::truncated("section count", e))?;
        if !is_valid_section_count(count) {
            return Err(FormatError::BadSectionCount(count));
        }

        let table = view
            .slice(
                header_start + FIXED_HEADER_SIZE,
                u64::from(count) * SECTION_HEADER_SIZE,
            )
            .map_err(|e| FormatError::truncated("section table", e))?;

        let mut cursor = Cursor::new(table);
        let mut sections = Vec::with_capacity(usize::from(count));
        for i in 0..u64::from(count) {
            // The table slice was bounds-checked above, so a failure here
            // can only mean a short read inside it.
            let section = SectionHeader::read_le(&mut cursor).map_err(|_| {
                FormatError::truncated(
                    "section header",
                    OutOfBounds {
                        offset: header_start + FIXED_HEADER_SIZE + i * SECTION_HEADER_SIZE,
                        len: SECTION_HEADER_SIZE,
                        available: len,
                    },
                )
            })?;
            sections.push(section);
        }

        if let Some((i, bad)) = sections
            .iter()
            .enumerate()
            .find(|(_, s)| !is_known_section_type(s.section_type))
        {
            return Err(FormatError::BadSectionType {
                index: i + 1,
                section_type: bad.section_type,
            });
        }

        Ok(Self { version, sections })
    }

    /// Number of sections
    pub fn section_count(&self) -> u8 {
        self.sections.len() as u8
    }

    /// Section by 1-based index
    pub fn section(&self, index: usize) -> Option<&SectionHeader> {
        index.checked_sub(1).and_then(|i| self.sections.get(i))
    }

    /// Size of the encoded header region including the trailer
    pub fn encoded_len(&self) -> usize {
        (FIXED_HEADER_SIZE + TRAILER_SIZE) as usize
            + self.sections.len() * SECTION_HEADER_SIZE as usize
    }

    /// Encode the header region and trailer
    ///
    /// The result decodes back to `self` on its own, and can be appended to
    /// section content to form a complete archive. No validation of version,
    /// count or types is done here so that invalid archives can be produced.
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, BuildError> {
        self.build_with_magic(MAGIC)
    }

    pub(crate) fn build_with_magic(
        &self,
        magic: [u8; 4],
    ) -> std::result::Result<Vec<u8>, BuildError> {
        let count = u8::try_from(self.sections.len())
            .map_err(|_| BuildError::TooManySections(self.sections.len()))?;
        let header_size = u16::try_from(self.encoded_len())
            .map_err(|_| BuildError::HeaderTooLarge(self.encoded_len()))?;

        let mut buffer = Vec::with_capacity(self.encoded_len());
        let mut cursor = Cursor::new(&mut buffer);
        self.version.write_le(&mut cursor)?;
        count.write_le(&mut cursor)?;
        for section in &self.sections {
            section.write_le(&mut cursor)?;
        }
        header_size.write_le(&mut cursor)?;
        magic.write_le(&mut cursor)?;
        Ok(buffer)
    }

    /// Human-readable listing: version, section count and one line per section
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.sections.len() + 2);
        lines.push(format!("version={}", self.version));
        lines.push(format!("nr_sections={}", self.sections.len()));
        for (i, s) in self.sections.iter().enumerate() {
            lines.push(format!(
                "section{}: {} {} {}",
                i + 1,
                s.name_str(),
                s.section_type,
                s.size
            ));
        }
        lines
    }
}

/// Decode an archive header from a complete file image
pub fn decode(data: &[u8]) -> Result<Header> {
    Header::parse(data)
}

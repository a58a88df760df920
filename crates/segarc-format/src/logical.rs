//! Logical address space over an archive's sections
//!
//! Sections are laid end to end in table order, each padded up to a
//! multiple of [`WINDOW_SIZE`]:
//!
//! ```text
//! logical: |-- section 1 --|pad|-- section 2 ----------|pad|-- section 3 -|pad|
//!          0               3072                        9216               12288
//! ```
//!
//! A caller addresses content with one linear offset and never needs to
//! know section boundaries. Padding is addressable but holds no content,
//! so reads that touch it are rejected.

use crate::error::AddressError;
use crate::header::Header;

/// Alignment of every section window
pub const WINDOW_SIZE: u64 = 3072;

/// Logical length occupied by a section of `size` bytes
pub fn window_len(size: u32) -> u64 {
    u64::from(size).div_ceil(WINDOW_SIZE) * WINDOW_SIZE
}

/// One section's slot in the logical space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// First logical offset of the window
    pub start: u64,
    /// Window length, a multiple of [`WINDOW_SIZE`]
    pub len: u64,
    /// Content bytes at the front of the window
    pub content_len: u64,
}

impl Window {
    /// Exclusive logical end
    pub const fn end(&self) -> u64 {
        self.start + self.len
    }
}

/// Result of a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LogicalLocation {
    /// 0-based section index in table order
    pub section: usize,
    /// Offset from the start of the section content
    pub offset: u64,
}

/// Precomputed window layout for one header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalSpace {
    windows: Vec<Window>,
    total: u64,
}

impl LogicalSpace {
    /// Lay out the sections of `header`
    pub fn new(header: &Header) -> Self {
        let mut start = 0u64;
        let windows = header
            .sections
            .iter()
            .map(|s| {
                let w = Window {
                    start,
                    len: window_len(s.size),
                    content_len: u64::from(s.size),
                };
                start = w.end();
                w
            })
            .collect();
        Self {
            windows,
            total: start,
        }
    }

    /// Sum of all window lengths
    pub const fn total_len(&self) -> u64 {
        self.total
    }

    /// Windows in section order
    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    /// Find the window containing `offset`
    ///
    /// Offsets inside padding translate successfully; use
    /// [`resolve`](Self::resolve) to validate a read.
    pub fn translate(&self, offset: u64) -> Result<LogicalLocation, AddressError> {
        // Empty windows have end == start and are skipped by the search.
        let section = self.windows.partition_point(|w| w.end() <= offset);
        let window = self.windows.get(section).ok_or(AddressError::OutOfRange {
            offset,
            len: 0,
            total: self.total,
        })?;
        Ok(LogicalLocation {
            section,
            offset: offset - window.start,
        })
    }

    /// Translate `offset` and check that `len` bytes from there are all
    /// section content
    pub fn resolve(&self, offset: u64, len: u64) -> Result<LogicalLocation, AddressError> {
        let out_of_range = AddressError::OutOfRange {
            offset,
            len,
            total: self.total,
        };
        let location = self.translate(offset).map_err(|_| out_of_range.clone())?;
        let content_len = self.windows[location.section].content_len;
        let end = location
            .offset
            .checked_add(len)
            .ok_or_else(|| out_of_range.clone())?;
        if location.offset >= content_len || end > content_len {
            return Err(out_of_range);
        }
        Ok(location)
    }
}

/// Translate a logical offset to `(0-based section index, offset in section)`
pub fn translate(header: &Header, offset: u64) -> Result<(usize, u64), AddressError> {
    LogicalSpace::new(header)
        .translate(offset)
        .map(|l| (l.section, l.offset))
}

//! Section content extraction and line access

use crate::bytes::ByteView;
use crate::error::{LineError, SectionError};
use crate::header::Header;

/// Borrow the content of the 1-based section `index` from the archive image
pub fn content<'a>(
    header: &Header,
    data: &'a [u8],
    index: usize,
) -> Result<&'a [u8], SectionError> {
    let section = header.section(index).ok_or(SectionError::InvalidSection {
        index,
        count: header.sections.len(),
    })?;

    ByteView::new(data)
        .slice(u64::from(section.offset), u64::from(section.size))
        .map_err(|e| SectionError::Truncated {
            index,
            offset: section.offset,
            size: section.size,
            available: e.available,
        })
}

/// Iterate the lines of `content`
///
/// Lines are separated by `'\n'`. The last line needs no separator, and a
/// separator at the very end does not start an extra empty line. Empty
/// content has no lines.
pub fn lines(content: &[u8]) -> impl Iterator<Item = &[u8]> {
    let body = content.strip_suffix(b"\n").unwrap_or(content);
    let empty = content.is_empty();
    body.split(|&b| b == b'\n').filter(move |_| !empty)
}

/// Select the 1-based line `number` and return its bytes in reverse order
///
/// The reversal is part of the query contract: `extract` reports each line
/// back to front.
pub fn line(content: &[u8], number: usize) -> Result<Vec<u8>, LineError> {
    let invalid = || LineError::InvalidLine {
        line: number,
        count: lines(content).count(),
    };
    let index = number.checked_sub(1).ok_or_else(invalid)?;
    let selected = lines(content).nth(index).ok_or_else(invalid)?;
    Ok(selected.iter().rev().copied().collect())
}

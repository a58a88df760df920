//! File-level query operations used by the command-line front end
//!
//! Each operation reads a whole file into memory and reports failures as a
//! [`QueryError`], whose [`message`](QueryError::message) gives the short
//! user-facing text for every distinct outcome.

use crate::error::{FormatError, LineError, SectionError, WalkError};
use crate::header::{Header, decode};
use crate::section;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Result type for query operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors produced by the query operations
#[derive(Debug, Error)]
pub enum QueryError {
    /// The file could not be read
    #[error("Cannot read {path}: {source}")]
    Io {
        /// File that was requested
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Header decoding failed while parsing
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Header decoding failed on the input of an extraction
    #[error("Invalid archive {path}: {source}")]
    InvalidArchive {
        /// File that was requested
        path: PathBuf,
        /// Decode failure
        source: FormatError,
    },

    /// Section lookup failed
    #[error(transparent)]
    Section(#[from] SectionError),

    /// Line lookup failed
    #[error(transparent)]
    Line(#[from] LineError),

    /// Directory walk could not start
    #[error(transparent)]
    Walk(#[from] WalkError),
}

impl QueryError {
    /// Short user-facing description of the failure
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Io { .. } | Self::InvalidArchive { .. } => "invalid file",
            Self::Format(FormatError::Truncated { .. }) => "truncated file",
            Self::Format(FormatError::BadMagic(_)) => "wrong magic",
            Self::Format(FormatError::BadVersion(_)) => "wrong version",
            Self::Format(FormatError::BadSectionCount(_)) => "wrong sect_nr",
            Self::Format(FormatError::BadSectionType { .. }) => "wrong sect_types",
            Self::Section(SectionError::InvalidSection { .. }) => "invalid section",
            Self::Section(SectionError::Truncated { .. }) => "section out of bounds",
            Self::Line(_) => "invalid line",
            Self::Walk(_) => "invalid directory path",
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| QueryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and decode the header of the archive at `path`
pub fn parse_file(path: impl AsRef<Path>) -> Result<Header> {
    let path = path.as_ref();
    let data = read(path)?;
    let header = decode(&data)?;
    debug!(path = %path.display(), sections = header.sections.len(), "Parsed archive");
    Ok(header)
}

/// Return line `line` of section `section` (both 1-based) of the archive at
/// `path`, with its bytes reversed
pub fn extract(path: impl AsRef<Path>, section: usize, line: usize) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let data = read(path)?;
    let header = decode(&data).map_err(|source| QueryError::InvalidArchive {
        path: path.to_path_buf(),
        source,
    })?;
    let content = section::content(&header, &data, section)?;
    Ok(section::line(content, line)?)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::builder::ArchiveBuilder;
    use crate::header::SectionHeader;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_parse_file() {
        let dir = TempDir::new().unwrap();
        let data = ArchiveBuilder::new(33)
            .section("one", 13, b"abc".to_vec())
            .section("two", 39, b"defgh".to_vec())
            .build()
            .unwrap();
        let path = write(&dir, "a.bin", &data);

        let header = parse_file(&path).unwrap();
        assert_eq!(header.version, 33);
        assert_eq!(header.sections[1].size, 5);
    }

    #[test]
    fn test_parse_messages() {
        let dir = TempDir::new().unwrap();
        let cases: Vec<(Vec<u8>, &str)> = vec![
            (
                ArchiveBuilder::new(40)
                    .magic(*b"XXXX")
                    .section("a", 13, vec![])
                    .section("b", 13, vec![])
                    .build()
                    .unwrap(),
                "wrong magic",
            ),
            (
                ArchiveBuilder::new(99)
                    .section("a", 13, vec![])
                    .section("b", 13, vec![])
                    .build()
                    .unwrap(),
                "wrong version",
            ),
            (
                ArchiveBuilder::new(40)
                    .section("a", 13, vec![])
                    .build()
                    .unwrap(),
                "wrong sect_nr",
            ),
            (
                ArchiveBuilder::new(40)
                    .section("a", 13, vec![])
                    .section("b", 14, vec![])
                    .build()
                    .unwrap(),
                "wrong sect_types",
            ),
            (b"Nn1J".to_vec(), "truncated file"),
        ];

        for (i, (data, expected)) in cases.into_iter().enumerate() {
            let path = write(&dir, &format!("{i}.bin"), &data);
            assert_eq!(parse_file(&path).unwrap_err().message(), expected);
        }

        let missing = dir.path().join("missing");
        assert_eq!(parse_file(missing).unwrap_err().message(), "invalid file");
    }

    #[test]
    fn test_extract() {
        let dir = TempDir::new().unwrap();
        let data = ArchiveBuilder::new(50)
            .section("a", 90, b"skip\nme".to_vec())
            .section("b", 90, b"first line\nsecond line\n".to_vec())
            .build()
            .unwrap();
        let path = write(&dir, "x.bin", &data);

        assert_eq!(extract(&path, 2, 2).unwrap(), b"enil dnoces");
        assert_eq!(extract(&path, 1, 2).unwrap(), b"em");
        assert_eq!(extract(&path, 3, 1).unwrap_err().message(), "invalid section");
        assert_eq!(extract(&path, 2, 3).unwrap_err().message(), "invalid line");
    }

    #[test]
    fn test_extract_reports_decode_failure_as_invalid_file() {
        let dir = TempDir::new().unwrap();
        let data = ArchiveBuilder::new(20)
            .section("a", 90, b"x".to_vec())
            .section("b", 90, b"y".to_vec())
            .build()
            .unwrap();
        let path = write(&dir, "old.bin", &data);
        assert_eq!(extract(&path, 1, 1).unwrap_err().message(), "invalid file");
    }

    #[test]
    fn test_extract_section_out_of_bounds() {
        let dir = TempDir::new().unwrap();
        let data = ArchiveBuilder::new(50)
            .section("a", 90, b"x".to_vec())
            .raw_section(SectionHeader::new("b", 90, 5000, 10))
            .build()
            .unwrap();
        let path = write(&dir, "bad.bin", &data);
        assert_eq!(
            extract(&path, 2, 1).unwrap_err().message(),
            "section out of bounds"
        );
    }
}

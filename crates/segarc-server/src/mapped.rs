//! Read-only memory-mapped input file.

use crate::error::CommandError;
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An input file mapped read-only for the rest of the session
/// (or until another file replaces it)
#[derive(Debug)]
pub struct MappedFile {
    path: PathBuf,
    mmap: Mmap,
}

impl MappedFile {
    /// Open and map `path`
    pub fn open(path: &Path) -> Result<Self, CommandError> {
        let file = File::open(path)
            .map_err(|e| CommandError::io(format!("Failed to open {}", path.display()), e))?;

        #[allow(unsafe_code)]
        let mmap = unsafe {
            MmapOptions::new()
                .map(&file)
                .map_err(|e| CommandError::io(format!("Failed to mmap {}", path.display()), e))?
        };

        debug!(path = %path.display(), len = mmap.len(), "Mapped input file");
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    /// Mapped bytes
    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// Length of the file
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Whether the file is empty
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Path the file was mapped from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_map_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"mapped content").unwrap();
        file.flush().unwrap();

        let mapped = MappedFile::open(file.path()).unwrap();
        assert_eq!(mapped.bytes(), b"mapped content");
        assert_eq!(mapped.len(), 14);
        assert_eq!(mapped.path(), file.path());
        assert!(!mapped.is_empty());
    }

    #[test]
    fn test_map_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let mapped = MappedFile::open(file.path()).unwrap();
        assert!(mapped.is_empty());
        assert_eq!(mapped.bytes(), b"");
    }

    #[test]
    fn test_map_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = MappedFile::open(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, CommandError::IoFailure { .. }));
    }
}

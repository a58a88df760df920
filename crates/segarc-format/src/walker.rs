//! Directory traversal: archive search and plain listings
//!
//! Both walkers yield entries in the order the platform's directory
//! enumeration returns them. That order is not sorted and differs between
//! filesystems, so callers that need a stable order must sort the results.
//! Symbolic links are never followed.

use crate::error::WalkError;
use crate::header::decode;
use memmap2::{Mmap, MmapOptions};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Open `root` as a directory, mirroring the check a listing performs
/// before yielding anything
fn check_root(root: &Path) -> Result<(), WalkError> {
    fs::read_dir(root)
        .map(drop)
        .map_err(|source| WalkError::InvalidDirectory {
            path: root.to_path_buf(),
            source,
        })
}

/// Pull the next readable entry, logging and skipping errors
fn next_entry(entries: &mut walkdir::IntoIter) -> Option<DirEntry> {
    loop {
        match entries.next()? {
            Ok(entry) => return Some(entry),
            Err(e) => warn!(error = %e, "Skipping unreadable directory entry"),
        }
    }
}

/// Lazy search for archives whose sections are all small enough
///
/// Created by [`find_matching`].
pub struct ArchiveWalker {
    entries: walkdir::IntoIter,
    threshold: u32,
}

impl std::fmt::Debug for ArchiveWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveWalker")
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

/// Map `path` read-only; `None` for an empty file
fn map_file(path: &Path) -> io::Result<Option<Mmap>> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }

    #[allow(unsafe_code)]
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    Ok(Some(mmap))
}

impl ArchiveWalker {
    fn accepts(&self, path: &Path) -> bool {
        let mmap = match map_file(path) {
            Ok(Some(mmap)) => mmap,
            Ok(None) => {
                debug!(path = %path.display(), "Skipping empty file");
                return false;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                return false;
            }
        };
        match decode(&mmap) {
            Ok(header) => header.sections.iter().all(|s| s.size <= self.threshold),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Not a valid archive");
                false
            }
        }
    }
}

impl Iterator for ArchiveWalker {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let entry = next_entry(&mut self.entries)?;
            if entry.file_type().is_file() && self.accepts(entry.path()) {
                return Some(entry.into_path());
            }
        }
    }
}

/// Recursively search `root` for valid archives in which every section's
/// size is at most `threshold`
///
/// Fails up front when `root` cannot be opened as a directory. After that,
/// files that cannot be read or decoded are skipped.
pub fn find_matching(root: impl AsRef<Path>, threshold: u32) -> Result<ArchiveWalker, WalkError> {
    let root = root.as_ref();
    check_root(root)?;
    Ok(ArchiveWalker {
        entries: WalkDir::new(root).min_depth(1).into_iter(),
        threshold,
    })
}

/// Filters for [`list_entries`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Directory to list
    pub root: PathBuf,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Only regular files strictly smaller than this many bytes
    pub size_smaller: Option<u64>,
    /// Only entries whose file name ends with this suffix
    pub name_ends_with: Option<String>,
}

impl ListOptions {
    /// List `root` without filters
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    fn accepts(&self, entry: &DirEntry) -> bool {
        if let Some(suffix) = &self.name_ends_with
            && !entry.file_name().to_string_lossy().ends_with(suffix.as_str())
        {
            return false;
        }
        match self.size_smaller {
            None => true,
            Some(limit) => {
                entry.file_type().is_file()
                    && entry.metadata().is_ok_and(|m| m.len() < limit)
            }
        }
    }
}

/// Lazy directory listing, created by [`list_entries`]
pub struct EntryLister {
    entries: walkdir::IntoIter,
    options: ListOptions,
}

impl std::fmt::Debug for EntryLister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryLister")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Iterator for EntryLister {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let entry = next_entry(&mut self.entries)?;
            if self.options.accepts(&entry) {
                return Some(entry.into_path());
            }
        }
    }
}

/// List the entries below `options.root` that pass the filters
pub fn list_entries(options: ListOptions) -> Result<EntryLister, WalkError> {
    check_root(&options.root)?;
    let mut walk = WalkDir::new(&options.root).min_depth(1);
    if !options.recursive {
        walk = walk.max_depth(1);
    }
    Ok(EntryLister {
        entries: walk.into_iter(),
        options,
    })
}

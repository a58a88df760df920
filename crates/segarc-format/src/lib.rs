//! Decoder, builder and query engine for segment archives
//!
#![allow(clippy::cast_possible_truncation)] // Counts are validated before narrowing
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::missing_errors_doc)] // Error enums document their variants
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! A segment archive is a file of raw section contents followed by a header
//! region and a fixed trailer. The header is located by reading backwards
//! from the end of the file and describes each section's name, type, offset
//! and size.
//!
//! # Modules
//!
//! - **header**: trailer and section table decoding and encoding
//! - **section**: section content extraction and line access
//! - **logical**: the padded linear address space over all sections
//! - **builder**: assembling complete archives
//! - **walker**: directory search for matching archives and plain listings
//! - **query**: file-level operations with user-facing error messages
//!
//! Every read from archive bytes goes through [`ByteView`], which rejects
//! any access outside the buffer instead of panicking.
//!
//! ```rust
//! use segarc_format::{ArchiveBuilder, LogicalSpace, decode, section};
//!
//! let data = ArchiveBuilder::new(40)
//!     .section("notes", 90, b"alpha\nbeta\n".to_vec())
//!     .section("blob", 13, vec![0; 4000])
//!     .build()?;
//!
//! let header = decode(&data)?;
//! let notes = section::content(&header, &data, 1)?;
//! assert_eq!(section::line(notes, 2)?, b"ateb");
//!
//! let space = LogicalSpace::new(&header);
//! assert_eq!(space.total_len(), 3072 + 6144);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

pub mod builder;
pub mod bytes;
pub mod error;
pub mod header;
pub mod logical;
pub mod query;
pub mod section;
pub mod walker;

pub use builder::ArchiveBuilder;
pub use bytes::ByteView;
pub use error::{
    AddressError, BuildError, FormatError, LineError, OutOfBounds, Result, SectionError,
    WalkError,
};
pub use header::{Header, MAGIC, SectionHeader, decode};
pub use logical::{LogicalLocation, LogicalSpace, WINDOW_SIZE, Window, translate};
pub use query::{QueryError, extract, parse_file};
pub use walker::{ArchiveWalker, EntryLister, ListOptions, find_matching, list_entries};

//! Builder for complete archive images

use crate::error::BuildError;
use crate::header::{Header, MAGIC, SectionHeader};

/// A section queued in the builder
#[derive(Debug, Clone)]
enum PendingSection {
    /// Content laid out by the builder
    Content {
        name: String,
        section_type: i32,
        data: Vec<u8>,
    },
    /// Header entry written verbatim, no content emitted
    Raw(SectionHeader),
}

/// Builds a segment archive: section contents back to back from offset 0,
/// followed by the header region and trailer.
///
/// The builder does not validate version, count or types, so it can also
/// produce archives that `decode` rejects.
///
/// ```rust
/// use segarc_format::{ArchiveBuilder, decode};
///
/// let data = ArchiveBuilder::new(50)
///     .section("text", 90, b"hello\nworld".to_vec())
///     .section("more", 13, b"x".to_vec())
///     .build()?;
/// let header = decode(&data)?;
/// assert_eq!(header.sections[0].size, 11);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    version: u32,
    magic: [u8; 4],
    sections: Vec<PendingSection>,
}

impl ArchiveBuilder {
    /// Start an archive with the given version
    pub fn new(version: u32) -> Self {
        Self {
            version,
            magic: MAGIC,
            sections: Vec::new(),
        }
    }

    /// Override the trailer magic
    #[must_use]
    pub fn magic(mut self, magic: [u8; 4]) -> Self {
        self.magic = magic;
        self
    }

    /// Append a section whose content is placed by the builder
    #[must_use]
    pub fn section(mut self, name: &str, section_type: i32, data: Vec<u8>) -> Self {
        self.sections.push(PendingSection::Content {
            name: name.to_string(),
            section_type,
            data,
        });
        self
    }

    /// Append a section header as-is, without any content
    #[must_use]
    pub fn raw_section(mut self, section: SectionHeader) -> Self {
        self.sections.push(PendingSection::Raw(section));
        self
    }

    /// Assemble the archive bytes
    pub fn build(self) -> Result<Vec<u8>, BuildError> {
        let mut body = Vec::new();
        let mut headers = Vec::with_capacity(self.sections.len());

        for pending in self.sections {
            match pending {
                PendingSection::Content {
                    name,
                    section_type,
                    data,
                } => {
                    let end = (body.len() + data.len()) as u64;
                    let offset = u32::try_from(body.len())
                        .map_err(|_| BuildError::ContentTooLarge(end))?;
                    let size = u32::try_from(data.len())
                        .map_err(|_| BuildError::ContentTooLarge(end))?;
                    headers.push(SectionHeader::new(&name, section_type, offset, size));
                    body.extend_from_slice(&data);
                }
                PendingSection::Raw(section) => headers.push(section),
            }
        }

        let header = Header {
            version: self.version,
            sections: headers,
        };
        body.extend(header.build_with_magic(self.magic)?);
        Ok(body)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use crate::header::decode;

    #[test]
    fn test_builder_layout() {
        let data = ArchiveBuilder::new(42)
            .section("one", 13, vec![1; 10])
            .section("two", 39, vec![2; 20])
            .build()
            .expect("build");

        let header = decode(&data).expect("decode");
        assert_eq!(header.version, 42);
        assert_eq!(header.sections[0].offset, 0);
        assert_eq!(header.sections[0].size, 10);
        assert_eq!(header.sections[1].offset, 10);
        assert_eq!(header.sections[1].size, 20);
        assert_eq!(&data[10..30], &[2; 20]);
        assert_eq!(data.len(), 30 + header.encoded_len());
    }

    #[test]
    fn test_builder_raw_section() {
        let data = ArchiveBuilder::new(42)
            .section("one", 13, vec![1; 4])
            .raw_section(SectionHeader::new("ghost", 90, 1000, 50))
            .build()
            .expect("build");

        let header = decode(&data).expect("decode");
        assert_eq!(header.sections[1].offset, 1000);
        assert_eq!(header.sections[1].name_str(), "ghost");
    }

    #[test]
    fn test_builder_custom_magic() {
        let data = ArchiveBuilder::new(42)
            .magic(*b"abcd")
            .section("one", 13, vec![])
            .section("two", 13, vec![])
            .build()
            .expect("build");
        assert_eq!(decode(&data), Err(FormatError::BadMagic(*b"abcd")));
    }
}

//! High-level [`Archive`] API: build, serialize, parse and read packed files.
//!
//! ```
//! use wpack::archive::Archive;
//!
//! let ar = Archive::build(&[&b"hi"[..], &b"bye"[..]])?;
//! let packed = ar.serialize();
//! assert_eq!(packed.len(), 25);
//!
//! let ar = Archive::parse(packed)?;
//! assert_eq!(ar.file_at(1)?, b"bye");
//! # Ok::<(), wpack::archive::ArchiveError>(())
//! ```

use std::io::{self, Write};
use std::iter::FusedIterator;
use std::path::Path;

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tracing::{debug, info};

use crate::index::{self, declared_index_size, index_size, FileRange, IndexError};
use crate::store::{PersistentStore, SourceSupplier};

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Cannot read source {source_id}: {source}")]
    SourceRead {
        source_id: String,
        #[source]
        source:    io::Error,
    },
    #[error("No input files supplied")]
    EmptyInputSet,
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("Truncated content: archive declares {declared} bytes, buffer holds {available}")]
    TruncatedContent { declared: u64, available: u64 },
    #[error("File index {index} out of range (archive holds {file_count} files)")]
    IndexOutOfRange { index: usize, file_count: usize },
    #[error("Archive of {size} bytes exceeds the 32-bit offset space")]
    ArchiveTooLarge { size: u64 },
    #[error("File {index} range [{start_offset}, +{length}) lies outside the content region")]
    RangeOutOfBounds { index: usize, start_offset: u32, length: u32 },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Archive ──────────────────────────────────────────────────────────────────

/// One packed container.  Immutable once built or parsed.
#[derive(Debug, Clone)]
pub struct Archive {
    ranges:  Vec<FileRange>,
    content: Bytes,
}

impl Archive {
    // ── Build path ───────────────────────────────────────────────────────────

    /// Pack `contents` in the given order.
    pub fn build<B: AsRef<[u8]>>(contents: &[B]) -> Result<Self, ArchiveError> {
        if contents.is_empty() {
            return Err(ArchiveError::EmptyInputSet);
        }

        let header = u32::try_from(contents.len())
            .map(declared_index_size)
            .map_err(|_| ArchiveError::ArchiveTooLarge { size: u64::MAX })?;
        let payload: u64 = contents.iter().map(|c| c.as_ref().len() as u64).sum();
        let total = header + payload;
        if total > u64::from(u32::MAX) {
            return Err(ArchiveError::ArchiveTooLarge { size: total });
        }

        let mut ranges  = Vec::with_capacity(contents.len());
        let mut content = BytesMut::with_capacity(payload as usize);
        // Every offset below is bounded by `total`, which fits a u32.
        let mut next = header as u32;
        for data in contents {
            let data = data.as_ref();
            let range = FileRange { start_offset: next, length: data.len() as u32 };
            debug!(file = ranges.len(), start = range.start_offset, len = range.length, "range");
            next += range.length;
            ranges.push(range);
            content.extend_from_slice(data);
        }

        info!(files = ranges.len(), bytes = total, "built archive");
        Ok(Self { ranges, content: content.freeze() })
    }

    /// Read every source through `supplier`, then pack them in order.
    pub fn from_sources<S, P>(supplier: &S, ids: &[P]) -> Result<Self, ArchiveError>
    where
        S: SourceSupplier + ?Sized,
        P: AsRef<Path>,
    {
        if ids.is_empty() {
            return Err(ArchiveError::EmptyInputSet);
        }
        let contents = ids
            .iter()
            .map(|id| {
                let id = id.as_ref();
                supplier.read_source(id).map_err(|source| ArchiveError::SourceRead {
                    source_id: id.display().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(&contents)
    }

    /// Serialized index for the current ranges.
    pub fn index_bytes(&self) -> Vec<u8> {
        index::encode(&self.ranges)
    }

    /// The exact on-disk byte sequence: index followed by content.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.archive_len());
        out.extend_from_slice(&self.index_bytes());
        out.extend_from_slice(&self.content);
        out
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        index::write_index(&self.ranges, &mut writer)?;
        writer.write_all(&self.content)
    }

    pub fn save<S: PersistentStore + ?Sized>(&self, store: &S, dest: &Path) -> Result<(), ArchiveError> {
        store.write_all(dest, &self.serialize())?;
        info!(dest = %dest.display(), bytes = self.archive_len(), "wrote archive");
        Ok(())
    }

    // ── Read path ────────────────────────────────────────────────────────────

    /// Parse a serialized archive.  A `Bytes` buffer is sliced, not copied.
    pub fn parse<T: Into<Bytes>>(buf: T) -> Result<Self, ArchiveError> {
        let buf: Bytes = buf.into();
        let (ranges, consumed) = index::decode(&buf)?;
        debug!(files = ranges.len(), content_start = consumed, "decoded index");

        let available = buf.len() as u64;
        let declared = consumed as u64 + ranges.iter().map(|r| u64::from(r.length)).sum::<u64>();
        if available < declared {
            return Err(ArchiveError::TruncatedContent { declared, available });
        }

        for (index, range) in ranges.iter().enumerate() {
            if (range.start_offset as usize) < consumed || range.end_offset() > available {
                return Err(ArchiveError::RangeOutOfBounds {
                    index,
                    start_offset: range.start_offset,
                    length:       range.length,
                });
            }
        }

        Ok(Self { ranges, content: buf.slice(consumed..) })
    }

    pub fn load<S: PersistentStore + ?Sized>(store: &S, src: &Path) -> Result<Self, ArchiveError> {
        Self::parse(store.read_all(src)?)
    }

    /// Borrowed view of file `i`'s bytes.
    pub fn file_at(&self, i: usize) -> Result<&[u8], ArchiveError> {
        let (start, end) = self.content_span(i)?;
        Ok(&self.content[start..end])
    }

    /// File `i` as a reference-counted buffer sharing the archive's storage.
    pub fn file_bytes(&self, i: usize) -> Result<Bytes, ArchiveError> {
        let (start, end) = self.content_span(i)?;
        Ok(self.content.slice(start..end))
    }

    /// Copy of file `i`'s bytes.
    pub fn file_owned(&self, i: usize) -> Result<Vec<u8>, ArchiveError> {
        self.file_at(i).map(<[u8]>::to_vec)
    }

    /// Every file in pack order, as `(index, bytes)` pairs.
    pub fn iter_files(&self) -> Files<'_> {
        Files { archive: self, cursor: 0 }
    }

    // ── Metadata ─────────────────────────────────────────────────────────────

    pub fn file_count(&self) -> usize { self.ranges.len() }

    pub fn ranges(&self) -> &[FileRange] { &self.ranges }

    /// Concatenated file contents, without the index.
    pub fn content(&self) -> &[u8] { &self.content }

    pub fn index_len(&self) -> usize { index_size(self.ranges.len()) }

    pub fn archive_len(&self) -> usize { self.index_len() + self.content.len() }

    /// Position of file `i` within `content`.
    fn content_span(&self, i: usize) -> Result<(usize, usize), ArchiveError> {
        let range = self.ranges.get(i).ok_or(ArchiveError::IndexOutOfRange {
            index:      i,
            file_count: self.ranges.len(),
        })?;
        let start = range.start_offset as usize - self.index_len();
        Ok((start, start + range.length as usize))
    }
}

impl<'a> IntoIterator for &'a Archive {
    type Item = (usize, &'a [u8]);
    type IntoIter = Files<'a>;

    fn into_iter(self) -> Files<'a> {
        self.iter_files()
    }
}

// ── Files ────────────────────────────────────────────────────────────────────

/// Iterator returned by [`Archive::iter_files`].
#[derive(Debug, Clone)]
pub struct Files<'a> {
    archive: &'a Archive,
    cursor:  usize,
}

impl<'a> Iterator for Files<'a> {
    type Item = (usize, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor;
        let data = self.archive.file_at(index).ok()?;
        self.cursor += 1;
        Some((index, data))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.archive.file_count().saturating_sub(self.cursor);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Files<'_> {}
impl FusedIterator for Files<'_> {}

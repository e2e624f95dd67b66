//! Fixed-layout index codec.
//!
//! # Layout
//! ```text
//! offset 0        u32  file_count = N
//! offset 4        N records of { u32 start_offset, u32 length }
//! offset 4 + 8N   file content
//! ```
//! All fields are little-endian.  `start_offset` is absolute: it is measured
//! from byte 0 of the whole archive, index included.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use serde::Serialize;
use std::io::{self, Write};
use thiserror::Error;

/// Width in bytes of every index field.
pub const FIELD_WIDTH: usize = 4;
/// Fields in one file record (start offset, length).
pub const FIELDS_PER_RECORD: usize = 2;
/// Size in bytes of one file record.
pub const RECORD_SIZE: usize = FIELD_WIDTH * FIELDS_PER_RECORD;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Malformed header: index needs {needed} bytes, buffer holds {available}")]
    MalformedHeader { needed: u64, available: usize },
}

/// Location of one packed file inside the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FileRange {
    pub start_offset: u32,
    pub length:       u32,
}

impl FileRange {
    /// One past the last byte of this file, as an absolute archive offset.
    pub fn end_offset(&self) -> u64 {
        u64::from(self.start_offset) + u64::from(self.length)
    }
}

/// Bytes occupied by an index describing `file_count` files.
pub const fn index_size(file_count: usize) -> usize {
    FIELD_WIDTH + RECORD_SIZE * file_count
}

/// Same as [`index_size`], computed in u64 so a count read off the wire cannot overflow.
pub fn declared_index_size(file_count: u32) -> u64 {
    FIELD_WIDTH as u64 + RECORD_SIZE as u64 * u64::from(file_count)
}

/// Serialize the file count followed by every record, in slice order.
pub fn encode(ranges: &[FileRange]) -> Vec<u8> {
    let mut buf = vec![0u8; index_size(ranges.len())];
    LittleEndian::write_u32(&mut buf[..FIELD_WIDTH], ranges.len() as u32);
    for (record, range) in buf[FIELD_WIDTH..].chunks_exact_mut(RECORD_SIZE).zip(ranges) {
        LittleEndian::write_u32(&mut record[..FIELD_WIDTH], range.start_offset);
        LittleEndian::write_u32(&mut record[FIELD_WIDTH..], range.length);
    }
    buf
}

/// Stream the index into `writer`.  Produces exactly the bytes of [`encode`].
pub fn write_index<W: Write>(ranges: &[FileRange], mut writer: W) -> io::Result<()> {
    writer.write_u32::<LittleEndian>(ranges.len() as u32)?;
    for range in ranges {
        writer.write_u32::<LittleEndian>(range.start_offset)?;
        writer.write_u32::<LittleEndian>(range.length)?;
    }
    Ok(())
}

/// Parse the index at the front of `buf`.
///
/// Returns the records and the number of bytes the index occupies; the byte
/// at that position is the first byte of file content.
pub fn decode(buf: &[u8]) -> Result<(Vec<FileRange>, usize), IndexError> {
    if buf.len() < FIELD_WIDTH {
        return Err(IndexError::MalformedHeader {
            needed:    FIELD_WIDTH as u64,
            available: buf.len(),
        });
    }
    let file_count = LittleEndian::read_u32(&buf[..FIELD_WIDTH]);
    let needed = declared_index_size(file_count);
    if (buf.len() as u64) < needed {
        return Err(IndexError::MalformedHeader { needed, available: buf.len() });
    }

    // `needed` fits in the buffer, so it fits in usize.
    let consumed = needed as usize;
    let ranges: Vec<FileRange> = buf[FIELD_WIDTH..consumed]
        .chunks_exact(RECORD_SIZE)
        .map(|record| FileRange {
            start_offset: LittleEndian::read_u32(&record[..FIELD_WIDTH]),
            length:       LittleEndian::read_u32(&record[FIELD_WIDTH..]),
        })
        .collect();

    Ok((ranges, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<FileRange> {
        vec![
            FileRange { start_offset: 20, length: 2 },
            FileRange { start_offset: 22, length: 3 },
        ]
    }

    #[test]
    fn index_size_law() {
        assert_eq!(index_size(0), 4);
        assert_eq!(index_size(1), 12);
        assert_eq!(index_size(2), 20);
        assert_eq!(index_size(1000), 8004);
    }

    #[test]
    fn encode_layout_is_little_endian() {
        let bytes = encode(&sample());
        assert_eq!(
            bytes,
            [2, 0, 0, 0, 20, 0, 0, 0, 2, 0, 0, 0, 22, 0, 0, 0, 3, 0, 0, 0]
        );
    }

    #[test]
    fn write_index_matches_encode() {
        let mut streamed = Vec::new();
        write_index(&sample(), &mut streamed).unwrap();
        assert_eq!(streamed, encode(&sample()));
    }

    #[test]
    fn decode_consumes_exactly_the_index() {
        let mut buf = encode(&sample());
        buf.extend_from_slice(b"hibye");
        let (ranges, consumed) = decode(&buf).unwrap();
        assert_eq!(ranges, sample());
        assert_eq!(consumed, 20);
        assert_eq!(&buf[consumed..], b"hibye");
    }

    #[test]
    fn decode_empty_index() {
        let (ranges, consumed) = decode(&[0, 0, 0, 0]).unwrap();
        assert!(ranges.is_empty());
        assert_eq!(consumed, 4);
    }

    #[test]
    fn decode_rejects_missing_count() {
        assert_eq!(
            decode(&[1, 0]),
            Err(IndexError::MalformedHeader { needed: 4, available: 2 })
        );
    }

    #[test]
    fn decode_rejects_short_records() {
        let buf = encode(&sample());
        let err = decode(&buf[..19]).unwrap_err();
        assert_eq!(err, IndexError::MalformedHeader { needed: 20, available: 19 });
    }

    #[test]
    fn decode_huge_count_does_not_overflow() {
        let err = decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(
            err,
            IndexError::MalformedHeader { needed: 4 + 8 * u64::from(u32::MAX), available: 8 }
        );
    }
}

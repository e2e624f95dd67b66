use proptest::prelude::*;
use wpack::archive::{Archive, ArchiveError};
use wpack::index::{self, index_size, IndexError};

fn inputs() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..16)
}

proptest! {
    #[test]
    fn test_roundtrip(files in inputs()) {
        let ar = Archive::parse(Archive::build(&files).unwrap().serialize()).unwrap();
        prop_assert_eq!(ar.file_count(), files.len());
        for (i, data) in ar.iter_files() {
            prop_assert_eq!(data, files[i].as_slice());
        }
    }

    #[test]
    fn test_deterministic(files in inputs()) {
        prop_assert_eq!(
            Archive::build(&files).unwrap().serialize(),
            Archive::build(&files).unwrap().serialize()
        );
    }

    #[test]
    fn test_offsets_chain_from_index_end(files in inputs()) {
        let ar = Archive::build(&files).unwrap();
        let ranges = ar.ranges();
        prop_assert_eq!(ranges[0].start_offset as usize, index_size(files.len()));
        for w in ranges.windows(2) {
            prop_assert_eq!(w[1].start_offset, w[0].start_offset + w[0].length);
        }
        prop_assert_eq!(ranges.last().unwrap().end_offset() as usize, ar.archive_len());
    }

    #[test]
    fn test_index_size_law(n in 0usize..100_000) {
        prop_assert_eq!(index_size(n), 4 + 8 * n);
        let ranges = vec![wpack::FileRange { start_offset: 0, length: 0 }; n.min(512)];
        prop_assert_eq!(index::encode(&ranges).len(), index_size(ranges.len()));
    }

    #[test]
    fn test_truncation_is_detected(files in inputs(), cut in any::<prop::sample::Index>()) {
        let packed = Archive::build(&files).unwrap().serialize();
        let header = index_size(files.len());
        let len = cut.index(packed.len());
        let result = Archive::parse(packed[..len].to_vec());
        if len < header {
            let is_malformed = matches!(result, Err(ArchiveError::Index(IndexError::MalformedHeader { .. })));
            prop_assert!(is_malformed);
        } else {
            // Only reachable when the cut removes at least one content byte.
            let is_truncated = matches!(result, Err(ArchiveError::TruncatedContent { .. }));
            prop_assert!(is_truncated);
        }
    }

    #[test]
    fn test_parse_never_panics(buf in prop::collection::vec(any::<u8>(), 0..128)) {
        if let Ok(ar) = Archive::parse(buf) {
            for (_, data) in ar.iter_files() {
                prop_assert!(data.len() <= ar.content().len());
            }
        }
    }
}

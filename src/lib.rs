pub mod index;
pub mod archive;
pub mod store;
pub mod pattern;
pub mod extract;

pub use index::{FileRange, IndexError, index_size};
pub use archive::{Archive, ArchiveError, Files};
pub use store::{FsStore, MemoryStore, PersistentStore, SourceSupplier};
pub use pattern::OutputPattern;
pub use extract::{extract_all, ExtractError, UnpackOptions};

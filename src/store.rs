//! Whole-buffer I/O collaborators.
//!
//! The archive core never touches the filesystem itself.  Input bytes come
//! from a [`SourceSupplier`]; finished archives and extracted files go
//! through a [`PersistentStore`].  Both only ever move complete buffers.

use bytes::Bytes;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Supplies the raw bytes of one input file.
pub trait SourceSupplier {
    fn read_source(&self, id: &Path) -> io::Result<Vec<u8>>;
}

/// Stores and retrieves complete byte buffers by destination.
pub trait PersistentStore {
    fn write_all(&self, dest: &Path, data: &[u8]) -> io::Result<()>;
    fn read_all(&self, dest: &Path) -> io::Result<Bytes>;
    fn exists(&self, dest: &Path) -> io::Result<bool>;
}

// ── Filesystem ───────────────────────────────────────────────────────────────

/// Local filesystem.  Writes land in a sibling temp file first and are then
/// renamed over the destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl SourceSupplier for FsStore {
    fn read_source(&self, id: &Path) -> io::Result<Vec<u8>> {
        fs::read(id)
    }
}

impl PersistentStore for FsStore {
    fn write_all(&self, dest: &Path, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = staging_path(dest);
        fs::write(&tmp, data)?;
        fs::rename(&tmp, dest).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            e
        })
    }

    fn read_all(&self, dest: &Path) -> io::Result<Bytes> {
        fs::read(dest).map(Bytes::from)
    }

    fn exists(&self, dest: &Path) -> io::Result<bool> {
        dest.try_exists()
    }
}

fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    dest.with_file_name(name)
}

// ── In-memory ────────────────────────────────────────────────────────────────

/// Map-backed store, used by tests and when embedding archives in memory.
/// Acts as a source supplier over the same map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<PathBuf, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: Into<PathBuf>, D: Into<Bytes>>(&self, dest: P, data: D) -> io::Result<()> {
        self.entries
            .write()
            .map_err(|_| poisoned())?
            .insert(dest.into(), data.into());
        Ok(())
    }

    pub fn len(&self) -> io::Result<usize> {
        Ok(self.entries.read().map_err(|_| poisoned())?.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        self.len().map(|n| n == 0)
    }
}

impl SourceSupplier for MemoryStore {
    fn read_source(&self, id: &Path) -> io::Result<Vec<u8>> {
        self.read_all(id).map(|b| b.to_vec())
    }
}

impl PersistentStore for MemoryStore {
    fn write_all(&self, dest: &Path, data: &[u8]) -> io::Result<()> {
        self.insert(dest, Bytes::copy_from_slice(data))
    }

    fn read_all(&self, dest: &Path) -> io::Result<Bytes> {
        self.entries
            .read()
            .map_err(|_| poisoned())?
            .get(dest)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound,
                format!("No such entry: {}", dest.display())))
    }

    fn exists(&self, dest: &Path) -> io::Result<bool> {
        Ok(self.entries.read().map_err(|_| poisoned())?.contains_key(dest))
    }
}

fn poisoned() -> io::Error { io::Error::new(io::ErrorKind::Other, "memory store lock poisoned") }

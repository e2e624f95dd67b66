//! Unpack every file of an [`Archive`] to a named destination.
//!
//! With the `parallel` feature, files are written concurrently on the Rayon
//! pool.  The archive is immutable, so workers share it without locking.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::archive::{Archive, ArchiveError};
use crate::pattern::OutputPattern;
use crate::store::PersistentStore;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("Refusing to overwrite {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("Cannot check {}: {source}", .path.display())]
    Stat {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot write {}: {source}", .path.display())]
    Write {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Configuration for [`extract_all`].
#[derive(Debug, Clone)]
pub struct UnpackOptions {
    /// Directory the rendered pattern is joined onto.
    pub output_dir: PathBuf,
    pub overwrite:  bool,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self { output_dir: PathBuf::from("."), overwrite: true }
    }
}

/// Write file `i` to `output_dir/pattern(i)` for every file, returning the
/// destinations in index order.
pub fn extract_all<S>(
    archive: &Archive,
    pattern: &OutputPattern,
    store:   &S,
    opts:    &UnpackOptions,
) -> Result<Vec<PathBuf>, ExtractError>
where
    S: PersistentStore + Sync + ?Sized,
{
    let targets: Vec<PathBuf> = (0..archive.file_count())
        .map(|i| opts.output_dir.join(pattern.render(i)))
        .collect();

    if !opts.overwrite {
        for target in &targets {
            let exists = store
                .exists(target)
                .map_err(|source| ExtractError::Stat { path: target.clone(), source })?;
            if exists {
                return Err(ExtractError::AlreadyExists(target.clone()));
            }
        }
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        targets
            .par_iter()
            .enumerate()
            .try_for_each(|(i, path)| extract_one(archive, i, path, store))?;
    }

    #[cfg(not(feature = "parallel"))]
    for (i, path) in targets.iter().enumerate() {
        extract_one(archive, i, path, store)?;
    }

    info!(files = targets.len(), dir = %opts.output_dir.display(), "unpacked archive");
    Ok(targets)
}

fn extract_one<S>(archive: &Archive, i: usize, path: &Path, store: &S) -> Result<(), ExtractError>
where
    S: PersistentStore + ?Sized,
{
    let data = archive.file_at(i)?;
    store
        .write_all(path, data)
        .map_err(|source| ExtractError::Write { path: path.to_path_buf(), source })?;
    debug!(file = i, path = %path.display(), len = data.len(), "extracted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn writes_each_file_under_its_pattern_name() {
        let ar = Archive::build(&["alpha", "beta"]).unwrap();
        let store = MemoryStore::new();
        let opts = UnpackOptions { output_dir: PathBuf::from("out"), ..Default::default() };
        let pattern = OutputPattern::parse("%03d.txt").unwrap();

        let written = extract_all(&ar, &pattern, &store, &opts).unwrap();

        assert_eq!(written, vec![PathBuf::from("out/000.txt"), PathBuf::from("out/001.txt")]);
        assert_eq!(store.read_all(Path::new("out/000.txt")).unwrap().as_ref(), b"alpha");
        assert_eq!(store.read_all(Path::new("out/001.txt")).unwrap().as_ref(), b"beta");
    }

    #[test]
    fn no_overwrite_refuses_existing_target() {
        let ar = Archive::build(&["new"]).unwrap();
        let store = MemoryStore::new();
        store.insert("000", &b"old"[..]).unwrap();
        let opts = UnpackOptions { output_dir: PathBuf::new(), overwrite: false };

        let err = extract_all(&ar, &OutputPattern::default(), &store, &opts).unwrap_err();

        assert!(matches!(err, ExtractError::AlreadyExists(p) if p == Path::new("000")));
        assert_eq!(store.read_all(Path::new("000")).unwrap().as_ref(), b"old");
    }
}

//! File-based storage backend for persistent storage.

use crate::backend::StorageBackend;
use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Suffix of the temporary file used for atomic snapshot replacement.
const TEMP_SUFFIX: &str = "tmp";
/// Suffix of the advisory lock file.
const LOCK_SUFFIX: &str = "lock";

/// A file-based storage backend.
///
/// The snapshot lives in a single file. Writes go to a sibling temporary
/// file which is synced and then renamed over the snapshot, so a crash
/// mid-write leaves either the old or the new snapshot intact.
///
/// # Locking
///
/// Opening the backend takes an advisory exclusive lock on a sibling
/// `.lock` file, held for the backend's lifetime. A second process opening
/// the same path gets [`StoreError::Locked`].
///
/// # Example
///
/// ```no_run
/// use esimsync_store::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open(Path::new("accounts.json")).unwrap();
/// backend.persist(b"{}").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    temp_path: PathBuf,
    /// Held for exclusive access; released on drop.
    _lock_file: File,
}

impl FileBackend {
    /// Opens a file backend at the given path, creating parent directories
    /// if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if another process holds the lock, or
    /// an I/O error if directories or the lock file cannot be created.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_path = sibling(path, LOCK_SUFFIX);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;

        Ok(Self {
            path: path.to_path_buf(),
            temp_path: sibling(path, TEMP_SUFFIX),
            _lock_file: lock_file,
        })
    }

    /// Returns the snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn load(&self) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn persist(&self, bytes: &[u8]) -> StoreResult<()> {
        let mut temp = File::create(&self.temp_path)?;
        temp.write_all(bytes)?;
        temp.sync_all()?;
        fs::rename(&self.temp_path, &self.path)?;
        Ok(())
    }
}

/// Builds `<path>.<suffix>` next to the snapshot file.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_missing_snapshot_is_none() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(&dir.path().join("store.json")).unwrap();
        assert!(backend.load().unwrap().is_none());
    }

    #[test]
    fn persist_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let backend = FileBackend::open(&path).unwrap();

        backend.persist(b"{\"users\":{}}").unwrap();
        assert_eq!(backend.load().unwrap(), Some(b"{\"users\":{}}".to_vec()));

        // Snapshot survives reopening.
        drop(backend);
        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.load().unwrap(), Some(b"{\"users\":{}}".to_vec()));
    }

    #[test]
    fn second_open_is_locked() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let _first = FileBackend::open(&path).unwrap();

        match FileBackend::open(&path) {
            Err(StoreError::Locked) => {}
            other => panic!("expected Locked, got {other:?}"),
        }
    }

    #[test]
    fn persist_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deep").join("store.json");
        let backend = FileBackend::open(&path).unwrap();
        backend.persist(b"x").unwrap();
        assert!(path.exists());
    }
}

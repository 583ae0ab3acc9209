//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::StoreResult;
use parking_lot::RwLock;

/// An in-memory storage backend.
///
/// Holds the snapshot in process memory. Suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral stores that don't need persistence
///
/// # Example
///
/// ```rust
/// use esimsync_store::{MemoryBackend, StorageBackend};
///
/// let backend = MemoryBackend::new();
/// assert!(backend.load().unwrap().is_none());
/// backend.persist(b"{}").unwrap();
/// assert_eq!(backend.load().unwrap(), Some(b"{}".to_vec()));
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
    snapshot: RwLock<Option<Vec<u8>>>,
}

impl MemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-loaded with a snapshot.
    ///
    /// Useful for testing recovery from an existing state.
    #[must_use]
    pub fn with_snapshot(bytes: Vec<u8>) -> Self {
        Self {
            snapshot: RwLock::new(Some(bytes)),
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.snapshot.read().clone())
    }

    fn persist(&self, bytes: &[u8]) -> StoreResult<()> {
        *self.snapshot.write() = Some(bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_backend_loads_none() {
        let backend = MemoryBackend::new();
        assert!(backend.load().unwrap().is_none());
    }

    #[test]
    fn persist_replaces_snapshot() {
        let backend = MemoryBackend::new();
        backend.persist(b"one").unwrap();
        backend.persist(b"two").unwrap();
        assert_eq!(backend.load().unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn preloaded_snapshot_is_visible() {
        let backend = MemoryBackend::with_snapshot(b"seed".to_vec());
        assert_eq!(backend.load().unwrap(), Some(b"seed".to_vec()));
    }
}

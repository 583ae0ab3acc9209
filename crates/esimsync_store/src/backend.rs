//! Storage backend trait definition.

use crate::error::StoreResult;

/// A low-level snapshot store for the local database.
///
/// Backends are **opaque byte stores**: they hold exactly one snapshot and
/// replace it wholesale. The [`crate::LocalStore`] owns all format
/// interpretation — backends do not understand users, esims, or sessions.
///
/// # Invariants
///
/// - `load` returns exactly the bytes of the last successful `persist`,
///   or `None` if nothing was ever persisted
/// - `persist` replaces the previous snapshot atomically: a crash mid-write
///   must leave either the old or the new snapshot, never a mix
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::MemoryBackend`] - for tests
/// - [`super::FileBackend`] - for persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads the current snapshot, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn load(&self) -> StoreResult<Option<Vec<u8>>>;

    /// Atomically replaces the snapshot with `bytes`.
    ///
    /// After this returns successfully, the new snapshot is durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the write or the durability barrier fails.
    fn persist(&self, bytes: &[u8]) -> StoreResult<()>;
}

//! # esimsync Store
//!
//! Durable local persistence for esimsync records.
//!
//! This crate provides the lowest layer of the engine: a [`StorageBackend`]
//! trait over **opaque snapshot bytes** (backends do not understand record
//! types), plus the typed [`LocalStore`] on top of it.
//!
//! ## Design principles
//!
//! - Backends are simple snapshot stores (load, persist)
//! - The store owns all format interpretation (a single JSON document)
//! - Reads never touch the network
//! - All writes are whole-record replace-by-key; every mutation persists the
//!   full snapshot before the write lock is released
//! - Record maps are keyed by natural key in sorted order, so an unchanged
//!   store serializes to byte-identical snapshots
//!
//! ## Available backends
//!
//! - [`MemoryBackend`] - for tests and ephemeral stores
//! - [`FileBackend`] - atomic temp-file-then-rename persistence with an
//!   advisory exclusive lock

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;
mod store;

pub use backend::StorageBackend;
pub use error::{StoreError, StoreResult};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use store::LocalStore;

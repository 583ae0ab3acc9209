//! Typed record store over a snapshot backend.

use crate::backend::StorageBackend;
use crate::error::{StoreError, StoreResult};
use esimsync_model::{EsimEntitlement, Session, User};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The serialized shape of a store snapshot.
///
/// Record maps are keyed by natural key. `BTreeMap` keeps the serialization
/// order stable, so an unchanged store round-trips to byte-identical
/// snapshots.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    users: BTreeMap<String, User>,
    #[serde(default)]
    esims: BTreeMap<String, EsimEntitlement>,
    #[serde(default)]
    session: Option<Session>,
}

/// Typed CRUD over Users and ESims plus a single Session slot.
///
/// All writes are whole-record replace-by-key; callers construct the full
/// record before writing. A single lock serializes access, and every
/// mutation persists the full snapshot before the write lock is released,
/// so two logical operations can never interleave into a torn record.
///
/// Reads never touch the network.
pub struct LocalStore {
    backend: Box<dyn StorageBackend>,
    state: RwLock<StoreState>,
}

impl LocalStore {
    /// Opens a store over the given backend, loading any existing snapshot.
    ///
    /// A persisted session that references a missing user is discarded here
    /// (it is invalid by definition).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupted`] if the snapshot cannot be decoded.
    pub fn open(backend: impl StorageBackend + 'static) -> StoreResult<Self> {
        let mut state = match backend.load()? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => StoreState::default(),
        };

        if let Some(session) = &state.session {
            let known = state.users.values().any(|u| u.id == session.user_id);
            if !known {
                state.session = None;
            }
        }

        Ok(Self {
            backend: Box::new(backend),
            state: RwLock::new(state),
        })
    }

    /// Opens an ephemeral in-memory store.
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(crate::MemoryBackend::new()),
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Serializes the current state and hands it to the backend.
    ///
    /// Called with the write lock held so persisted snapshots observe
    /// mutations in order.
    fn persist(&self, state: &StoreState) -> StoreResult<()> {
        let bytes = serde_json::to_vec(state)?;
        self.backend.persist(&bytes)
    }

    /// Returns the serialized snapshot of the current state.
    ///
    /// Useful for asserting byte-for-byte idempotence across sync cycles.
    pub fn snapshot(&self) -> StoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(&*self.state.read())?)
    }

    // --- Users ---

    /// Returns all users, ordered by email.
    pub fn users(&self) -> Vec<User> {
        self.state.read().users.values().cloned().collect()
    }

    /// Looks up a user by email.
    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.state.read().users.get(email).cloned()
    }

    /// Looks up a user by id.
    pub fn user_by_id(&self, id: &str) -> Option<User> {
        self.state
            .read()
            .users
            .values()
            .find(|u| u.id == id)
            .cloned()
    }

    /// Inserts or replaces a user, keyed by email.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidRecord`] for an empty email.
    pub fn put_user(&self, user: User) -> StoreResult<()> {
        if user.email.is_empty() {
            return Err(StoreError::InvalidRecord("user email is empty".into()));
        }
        let mut state = self.state.write();
        state.users.insert(user.email.clone(), user);
        self.persist(&state)
    }

    /// Replaces the whole user set with a merged set.
    pub fn replace_users(&self, users: Vec<User>) -> StoreResult<()> {
        let mut state = self.state.write();
        state.users = users.into_iter().map(|u| (u.email.clone(), u)).collect();
        self.persist(&state)
    }

    // --- ESims ---

    /// Returns all entitlements, ordered by iccid.
    pub fn esims(&self) -> Vec<EsimEntitlement> {
        self.state.read().esims.values().cloned().collect()
    }

    /// Returns the entitlements owned by the given user.
    pub fn esims_for_user(&self, user_id: &str) -> Vec<EsimEntitlement> {
        self.state
            .read()
            .esims
            .values()
            .filter(|e| e.owner_user_id == user_id)
            .cloned()
            .collect()
    }

    /// Inserts or replaces an entitlement, keyed by iccid.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidRecord`] for an empty iccid.
    pub fn put_esim(&self, esim: EsimEntitlement) -> StoreResult<()> {
        if esim.iccid.is_empty() {
            return Err(StoreError::InvalidRecord("esim iccid is empty".into()));
        }
        let mut state = self.state.write();
        state.esims.insert(esim.iccid.clone(), esim);
        self.persist(&state)
    }

    /// Replaces the whole entitlement set with a merged set.
    pub fn replace_esims(&self, esims: Vec<EsimEntitlement>) -> StoreResult<()> {
        let mut state = self.state.write();
        state.esims = esims.into_iter().map(|e| (e.iccid.clone(), e)).collect();
        self.persist(&state)
    }

    // --- Session slot ---

    /// Returns the current session, discarding it if its user is gone.
    pub fn session(&self) -> Option<Session> {
        let state = self.state.read();
        let session = state.session.clone()?;
        let known = state.users.values().any(|u| u.id == session.user_id);
        drop(state);

        if known {
            Some(session)
        } else {
            // Invalid by the session invariant; drop it from the snapshot.
            let mut state = self.state.write();
            state.session = None;
            let _ = self.persist(&state);
            None
        }
    }

    /// Installs a session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidRecord`] if the session references a
    /// user the store does not hold.
    pub fn set_session(&self, session: Session) -> StoreResult<()> {
        let mut state = self.state.write();
        let known = state.users.values().any(|u| u.id == session.user_id);
        if !known {
            return Err(StoreError::InvalidRecord(format!(
                "session references unknown user {}",
                session.user_id
            )));
        }
        state.session = Some(session);
        self.persist(&state)
    }

    /// Clears the session slot unconditionally.
    pub fn clear_session(&self) -> StoreResult<()> {
        let mut state = self.state.write();
        state.session = None;
        self.persist(&state)
    }
}

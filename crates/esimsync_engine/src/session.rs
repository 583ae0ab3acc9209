//! Session management: the engine's public entry point.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult, ValidationError};
use crate::http::HttpClient;
use crate::merge::reconcile_user;
use crate::orchestrator::{SyncCycleResult, SyncOrchestrator};
use crate::transport::TransportClient;
use chrono::Utc;
use esimsync_model::{
    EsimEntitlement, RecordOrigin, RegisterRequest, RemoteUser, Session, User,
};
use esimsync_store::LocalStore;
use parking_lot::RwLock;
use std::sync::Arc;

/// Authentication state of the client.
///
/// `LoggedOut -> Authenticating -> {LoggedIn, OfflineLoggedIn}`, and back to
/// `LoggedOut` only through [`SessionManager::logout`]. No other
/// transitions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session.
    LoggedOut,
    /// A login or registration is in flight.
    Authenticating,
    /// Authenticated, identity confirmed locally or remotely.
    LoggedIn,
    /// Authenticated against local state only while no endpoint was
    /// reachable. Degraded: the credential has not been verified against
    /// the remote; operations requiring authoritative identity must
    /// re-attempt a remote login first.
    OfflineLoggedIn,
}

impl SessionState {
    /// True in either logged-in state.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::LoggedIn | SessionState::OfflineLoggedIn)
    }

    /// True only in the degraded offline state.
    pub fn is_degraded(&self) -> bool {
        matches!(self, SessionState::OfflineLoggedIn)
    }
}

/// Profile fields supplied at registration.
#[derive(Debug, Clone)]
pub struct NewUserProfile {
    /// Natural key.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

/// Login, registration, and session queries over the local store, with the
/// sync stack as the remote fallback.
///
/// The local store is always consulted first; the network is touched only
/// when local state cannot answer.
pub struct SessionManager<C: HttpClient> {
    store: Arc<LocalStore>,
    transport: Arc<TransportClient<C>>,
    orchestrator: Arc<SyncOrchestrator<C>>,
    state: RwLock<SessionState>,
    min_credential_len: usize,
}

impl<C: HttpClient + 'static> SessionManager<C> {
    /// Creates a session manager over the engine's shared components.
    pub fn new(
        store: Arc<LocalStore>,
        transport: Arc<TransportClient<C>>,
        orchestrator: Arc<SyncOrchestrator<C>>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            store,
            transport,
            orchestrator,
            state: RwLock::new(SessionState::LoggedOut),
            min_credential_len: config.min_credential_len,
        }
    }

    /// Returns the current authentication state.
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Authenticates a user.
    ///
    /// Local fast path first: a stored record whose credential verifies
    /// answers without any network traffic. Otherwise the remote is asked;
    /// offline with a matching local record degrades to
    /// [`SessionState::OfflineLoggedIn`].
    ///
    /// # Errors
    ///
    /// [`SyncError::AuthenticationFailed`] when the remote rejects the
    /// credentials; [`SyncError::NetworkUnavailable`] when offline with no
    /// matching local record; transport errors pass through.
    pub async fn login(&self, email: &str, credential: &str) -> SyncResult<Session> {
        *self.state.write() = SessionState::Authenticating;

        if let Some(user) = self.store.user_by_email(email) {
            if user.verify_credential(credential) {
                tracing::info!(email, "login served from local store");
                return self.open_session(&user.id, SessionState::LoggedIn);
            }
        }

        match self.transport.login(email, credential).await {
            Ok(remote_user) => {
                let user = self.adopt_remote_login(remote_user, credential)?;
                tracing::info!(email, "login verified against remote");
                self.open_session(&user.id, SessionState::LoggedIn)
            }
            Err(SyncError::NetworkUnavailable) => match self.store.user_by_email(email) {
                Some(user) => {
                    tracing::warn!(email, "offline login: credential not verified remotely");
                    self.open_session(&user.id, SessionState::OfflineLoggedIn)
                }
                None => {
                    *self.state.write() = SessionState::LoggedOut;
                    Err(SyncError::NetworkUnavailable)
                }
            },
            Err(SyncError::Rejected(message)) => {
                tracing::info!(email, %message, "remote rejected login");
                *self.state.write() = SessionState::LoggedOut;
                Err(SyncError::AuthenticationFailed)
            }
            Err(err) => {
                *self.state.write() = SessionState::LoggedOut;
                Err(err)
            }
        }
    }

    /// Upserts the local record after a successful remote login. This is
    /// the single place where `needs_credential_sync` is cleared.
    fn adopt_remote_login(&self, remote: RemoteUser, credential: &str) -> SyncResult<User> {
        let mut user = match self.store.user_by_email(&remote.email) {
            Some(existing) => reconcile_user(&existing, &remote),
            None => User {
                id: remote.id.clone(),
                email: remote.email.clone(),
                credential: None,
                first_name: remote.first_name.clone(),
                last_name: remote.last_name.clone(),
                created_at: remote.created_at,
                origin: RecordOrigin::Reconciled,
                needs_credential_sync: true,
            },
        };
        user.adopt_credential(credential);
        user.origin = RecordOrigin::Reconciled;
        self.store.put_user(user.clone())?;
        Ok(user)
    }

    /// Registers a new account.
    ///
    /// Validation happens before any network call. The record is created
    /// optimistically and the caller gets a session in both outcomes; a
    /// failed remote registration leaves the record `LocalOnly` for the
    /// orchestrator's push step and fires a background sync.
    ///
    /// # Errors
    ///
    /// [`ValidationError`] variants for malformed input; store errors.
    pub async fn register(
        &self,
        profile: NewUserProfile,
        credential: &str,
        credential_confirm: &str,
    ) -> SyncResult<Session> {
        let email = profile.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ValidationError::InvalidEmail.into());
        }
        if credential.len() < self.min_credential_len {
            return Err(ValidationError::CredentialTooShort {
                min: self.min_credential_len,
            }
            .into());
        }
        if credential != credential_confirm {
            return Err(ValidationError::CredentialMismatch.into());
        }
        if self.store.user_by_email(email).is_some() {
            return Err(ValidationError::EmailTaken.into());
        }

        *self.state.write() = SessionState::Authenticating;

        let user = User::local(
            email,
            credential,
            &profile.first_name,
            &profile.last_name,
            Utc::now(),
        );
        self.store.put_user(user.clone())?;

        let request = RegisterRequest {
            email: email.to_string(),
            password: credential.to_string(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
        };
        match self.transport.register(&request).await {
            Ok(()) => {
                let mut reconciled = user.clone();
                reconciled.origin = RecordOrigin::Reconciled;
                self.store.put_user(reconciled)?;
                tracing::info!(email, "registered locally and remotely");
            }
            Err(err) => {
                tracing::warn!(email, error = %err, "remote registration failed, record stays local");
                // On-demand trigger: let the push step retry in the background.
                let orchestrator = Arc::clone(&self.orchestrator);
                tokio::spawn(async move {
                    orchestrator.run_sync().await;
                });
            }
        }

        self.open_session(&user.id, SessionState::LoggedIn)
    }

    /// Clears the session slot unconditionally. Users and ESims are
    /// untouched.
    pub fn logout(&self) -> SyncResult<()> {
        self.store.clear_session()?;
        *self.state.write() = SessionState::LoggedOut;
        tracing::info!("logged out");
        Ok(())
    }

    /// Returns the user behind the current session, if any.
    pub fn current_user(&self) -> Option<User> {
        let session = self.store.session()?;
        self.store.user_by_id(&session.user_id)
    }

    /// Returns the current user's entitlements after a best-effort sync
    /// pass. Sync failures are already captured in the cycle report and do
    /// not affect the answer.
    pub async fn user_esims(&self) -> Vec<EsimEntitlement> {
        let _ = self.orchestrator.run_sync().await;
        match self.current_user() {
            Some(user) => self.store.esims_for_user(&user.id),
            None => Vec::new(),
        }
    }

    /// Runs a sync cycle now and reports how it went.
    pub async fn force_sync_now(&self) -> SyncCycleResult {
        self.orchestrator.run_sync().await
    }

    fn open_session(&self, user_id: &str, state: SessionState) -> SyncResult<Session> {
        let session = Session::issue(user_id, Utc::now());
        match self.store.set_session(session.clone()) {
            Ok(()) => {
                *self.state.write() = state;
                Ok(session)
            }
            Err(err) => {
                *self.state.write() = SessionState::LoggedOut;
                Err(err.into())
            }
        }
    }
}

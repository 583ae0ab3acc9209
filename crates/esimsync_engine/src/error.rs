//! Error taxonomy for the sync engine.

use esimsync_store::StoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in the sync engine.
///
/// `NetworkUnavailable` is an expected, non-fatal outcome: the engine
/// degrades to offline operation and the orchestrator silently defers the
/// cycle. Background sync never surfaces any of these to callers; session
/// login/register do.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Every candidate endpoint failed or timed out.
    #[error("no reachable endpoint")]
    NetworkUnavailable,

    /// A single request exceeded its deadline; the in-flight call was
    /// aborted, not abandoned.
    #[error("operation timed out")]
    Timeout,

    /// Network or connection error below the HTTP layer.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The server answered with a non-2xx status; carries the
    /// server-supplied message when the error body parsed.
    #[error("server rejected request: {0}")]
    Rejected(String),

    /// A 2xx response whose body could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Credentials were rejected both locally and remotely.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Input rejected before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Local persistence failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Timeout | SyncError::NetworkUnavailable => true,
            _ => false,
        }
    }

    /// Returns true if this is the expected offline outcome.
    pub fn is_offline(&self) -> bool {
        matches!(self, SyncError::NetworkUnavailable)
    }
}

/// Malformed input, rejected before any network call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The email does not look like an address.
    #[error("invalid email address")]
    InvalidEmail,

    /// An account with this email already exists locally.
    #[error("an account with this email already exists")]
    EmailTaken,

    /// The credential is below the configured minimum length.
    #[error("credential must be at least {min} characters")]
    CredentialTooShort {
        /// Configured minimum length.
        min: usize,
    },

    /// The credential confirmation does not match.
    #[error("credential confirmation does not match")]
    CredentialMismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(SyncError::transport_retryable("connection reset").is_retryable());
        assert!(!SyncError::transport_fatal("bad certificate").is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(SyncError::NetworkUnavailable.is_retryable());
        assert!(!SyncError::AuthenticationFailed.is_retryable());
        assert!(!SyncError::Rejected("duplicate".into()).is_retryable());
    }

    #[test]
    fn offline_classification() {
        assert!(SyncError::NetworkUnavailable.is_offline());
        assert!(!SyncError::Timeout.is_offline());
    }

    #[test]
    fn validation_display() {
        let err = SyncError::from(ValidationError::CredentialTooShort { min: 6 });
        assert_eq!(err.to_string(), "credential must be at least 6 characters");
    }
}

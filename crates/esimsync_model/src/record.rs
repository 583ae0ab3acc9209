//! Domain records synchronized between the client and the remote.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a record currently stands relative to the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordOrigin {
    /// Created locally and not yet acknowledged by the remote.
    LocalOnly,
    /// Discovered during a pull; has never authenticated locally.
    RemoteOnly,
    /// Present on both sides after a merge pass.
    Reconciled,
}

impl RecordOrigin {
    /// Returns true if the record is a candidate for the push step.
    pub fn is_push_candidate(&self) -> bool {
        matches!(self, RecordOrigin::LocalOnly)
    }
}

/// A user account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque identifier. Assigned by whichever side created the record
    /// first; a remote-assigned id supersedes a local one at reconciliation.
    pub id: String,
    /// Natural key, unique across the user set.
    pub email: String,
    /// Local authentication secret. `None` is the unusable placeholder for
    /// records discovered from the remote; the remote never supplies it.
    pub credential: Option<String>,
    /// Given name. Remote-authoritative for reconciled records.
    pub first_name: String,
    /// Family name. Remote-authoritative for reconciled records.
    pub last_name: String,
    /// Immutable creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Merge-policy tag.
    pub origin: RecordOrigin,
    /// True until the first successful remote authentication against a
    /// remote-discovered record; cleared exactly once.
    pub needs_credential_sync: bool,
}

impl User {
    /// Creates a locally-registered user with a fresh id.
    pub fn local(
        email: impl Into<String>,
        credential: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.into(),
            credential: Some(credential.into()),
            first_name: first_name.into(),
            last_name: last_name.into(),
            created_at: now,
            origin: RecordOrigin::LocalOnly,
            needs_credential_sync: false,
        }
    }

    /// Checks a candidate credential against this record.
    ///
    /// A record still flagged `needs_credential_sync` never verifies: its
    /// placeholder cannot authenticate until a remote login supplies the
    /// real secret.
    pub fn verify_credential(&self, candidate: &str) -> bool {
        !self.needs_credential_sync && self.credential.as_deref() == Some(candidate)
    }

    /// Installs a verified credential after the first successful remote
    /// authentication, clearing `needs_credential_sync`.
    pub fn adopt_credential(&mut self, credential: impl Into<String>) {
        self.credential = Some(credential.into());
        self.needs_credential_sync = false;
    }
}

/// Lifecycle status of an eSIM entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EsimStatus {
    /// Entitlement is usable.
    Active,
    /// `valid_until` has passed.
    Expired,
    /// Provisioned but not activated.
    Inactive,
}

/// An eSIM entitlement owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsimEntitlement {
    /// Natural key: the SIM profile's ICCID.
    pub iccid: String,
    /// Id of the owning [`User`].
    pub owner_user_id: String,
    /// Commercial plan name. Remote-authoritative.
    pub plan_name: String,
    /// Data allowance in bytes. Remote-authoritative.
    pub data_limit_bytes: u64,
    /// Entitlement expiry. Remote-authoritative.
    pub valid_until: DateTime<Utc>,
    /// ISO country code of the plan, when known.
    pub country_code: Option<String>,
    /// Current status. Recomputed from `valid_until` at every merge pass.
    pub status: EsimStatus,
    /// Merge-policy tag.
    pub origin: RecordOrigin,
}

impl EsimEntitlement {
    /// Returns the status this entitlement should carry at `now`.
    ///
    /// An entitlement past its `valid_until` is `Expired` regardless of what
    /// either side last recorded.
    pub fn effective_status(&self, now: DateTime<Utc>) -> EsimStatus {
        if self.valid_until < now {
            EsimStatus::Expired
        } else {
            self.status
        }
    }
}

/// An authenticated run of the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// The authenticated [`User`]'s id. A session whose user is missing
    /// from the local store is invalid and is discarded on read.
    pub user_id: String,
    /// When the session was issued.
    pub issued_at: DateTime<Utc>,
}

impl Session {
    /// Issues a fresh session for the given user.
    pub fn issue(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            issued_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn local_user_is_push_candidate() {
        let user = User::local("a@x.com", "secret1", "Ada", "Lovelace", Utc::now());
        assert!(user.origin.is_push_candidate());
        assert!(!user.needs_credential_sync);
        assert!(user.verify_credential("secret1"));
        assert!(!user.verify_credential("wrong"));
    }

    #[test]
    fn placeholder_credential_never_verifies() {
        let mut user = User::local("b@x.com", "secret1", "B", "X", Utc::now());
        user.credential = None;
        user.needs_credential_sync = true;

        assert!(!user.verify_credential("secret1"));
        assert!(!user.verify_credential(""));

        user.adopt_credential("secret1");
        assert!(!user.needs_credential_sync);
        assert!(user.verify_credential("secret1"));
    }

    #[test]
    fn effective_status_expires_by_date() {
        let now = Utc::now();
        let esim = EsimEntitlement {
            iccid: "8988247000001".into(),
            owner_user_id: "u1".into(),
            plan_name: "Europe 5GB".into(),
            data_limit_bytes: 5 * 1024 * 1024 * 1024,
            valid_until: now - Duration::days(1),
            country_code: Some("ES".into()),
            status: EsimStatus::Active,
            origin: RecordOrigin::Reconciled,
        };

        assert_eq!(esim.effective_status(now), EsimStatus::Expired);

        let future = EsimEntitlement {
            valid_until: now + Duration::days(30),
            ..esim
        };
        assert_eq!(future.effective_status(now), EsimStatus::Active);
    }

    #[test]
    fn session_tokens_are_distinct() {
        let session = Session::issue("u1", Utc::now());
        assert_ne!(session.access_token, session.refresh_token);
        assert_eq!(session.user_id, "u1");
    }

    #[test]
    fn status_wire_casing() {
        let json = serde_json::to_string(&EsimStatus::Active).unwrap();
        assert_eq!(json, "\"active\"");
        let back: EsimStatus = serde_json::from_str("\"expired\"").unwrap();
        assert_eq!(back, EsimStatus::Expired);
    }
}

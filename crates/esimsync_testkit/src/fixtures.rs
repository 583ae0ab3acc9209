//! Record builders with sensible defaults.

use chrono::{Duration, Utc};
use esimsync_model::{EsimEntitlement, EsimStatus, RecordOrigin, RemoteUser, Session, User};

/// Default credential used by user fixtures.
pub const CREDENTIAL: &str = "secret1";

/// A locally-registered user with the fixture credential.
pub fn user(email: &str) -> User {
    let name = email.split('@').next().unwrap_or("user");
    User::local(email, CREDENTIAL, name, "Fixture", Utc::now())
}

/// A user as the remote would serve it.
pub fn remote_user(id: u64, email: &str) -> RemoteUser {
    let name = email.split('@').next().unwrap_or("user");
    RemoteUser {
        id: id.to_string(),
        email: email.to_string(),
        first_name: name.to_string(),
        last_name: "Remote".to_string(),
        created_at: Utc::now(),
    }
}

/// An active entitlement valid for 30 days.
pub fn esim(iccid: &str, owner_user_id: &str) -> EsimEntitlement {
    EsimEntitlement {
        iccid: iccid.to_string(),
        owner_user_id: owner_user_id.to_string(),
        plan_name: "Europe 5GB".to_string(),
        data_limit_bytes: 5 * 1024 * 1024 * 1024,
        valid_until: Utc::now() + Duration::days(30),
        country_code: Some("ES".to_string()),
        status: EsimStatus::Active,
        origin: RecordOrigin::LocalOnly,
    }
}

/// An entitlement whose validity window closed yesterday but whose recorded
/// status is still `Active` (the stale shape the merge must repair).
pub fn expired_esim(iccid: &str, owner_user_id: &str) -> EsimEntitlement {
    EsimEntitlement {
        valid_until: Utc::now() - Duration::days(1),
        ..esim(iccid, owner_user_id)
    }
}

/// A freshly-issued session for the given user id.
pub fn session(user_id: &str) -> Session {
    Session::issue(user_id, Utc::now())
}

//! JSON wire messages for the remote sync protocol.
//!
//! Field names follow the remote API (camelCase, `action`-tagged request
//! bodies). Credentials appear on the wire only in the push direction
//! (`send_users`, `register`, `login`); pull responses never carry them.

use crate::record::{EsimEntitlement, EsimStatus, RecordOrigin};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Accepts an id as either a JSON number or a string.
///
/// Remote-assigned ids are numeric database keys; locally-assigned ids are
/// uuids. Both sides of the sync treat ids as opaque strings.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(serde_json::Number),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

/// A user record as the remote serves it. No credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    /// Remote-assigned identifier.
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    /// Natural key.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Creation timestamp on the remote side.
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /auth/sync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum UserSyncRequest {
    /// Pull the remote user set.
    #[serde(rename = "get_users")]
    GetUsers,
    /// Push locally-created users to the remote.
    #[serde(rename = "send_users")]
    SendUsers {
        /// The records to push.
        users: Vec<UserPush>,
    },
}

/// One user in a `send_users` push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPush {
    /// Natural key.
    pub email: String,
    /// The locally-held credential; the remote stores it for web login.
    pub password: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

/// Response to a `get_users` pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSyncResponse {
    /// Whether the remote accepted the request.
    pub success: bool,
    /// The remote user set; absent on failure.
    #[serde(default)]
    pub users: Option<Vec<RemoteUser>>,
    /// Server-supplied error message, if any.
    #[serde(default)]
    pub message: Option<String>,
}

impl UserSyncResponse {
    /// Creates a successful pull response.
    pub fn success(users: Vec<RemoteUser>) -> Self {
        Self {
            success: true,
            users: Some(users),
            message: None,
        }
    }

    /// Creates a failed pull response with a server message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            users: None,
            message: Some(message.into()),
        }
    }
}

/// Outcome counts for a `send_users` push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSummary {
    /// Records the remote created.
    pub added: u64,
    /// Records the remote already had (idempotent dedup).
    pub existing: u64,
}

/// Response to a `send_users` push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendUsersResponse {
    /// Whether the remote accepted the push.
    pub success: bool,
    /// Per-record outcome counts; absent on failure.
    #[serde(default)]
    pub result: Option<PushSummary>,
    /// Server-supplied error message, if any.
    #[serde(default)]
    pub message: Option<String>,
}

impl SendUsersResponse {
    /// Creates a successful push response.
    pub fn success(summary: PushSummary) -> Self {
        Self {
            success: true,
            result: Some(summary),
            message: None,
        }
    }

    /// Creates a failed push response with a server message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            message: Some(message.into()),
        }
    }
}

/// Request body for `POST /auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Natural key.
    pub email: String,
    /// Chosen credential.
    pub password: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Natural key.
    pub email: String,
    /// Candidate credential.
    pub password: String,
}

/// Response to a remote login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Whether the credentials were accepted.
    pub success: bool,
    /// The authenticated user's profile on success.
    #[serde(default)]
    pub user: Option<RemoteUser>,
    /// Server-supplied rejection message, if any.
    #[serde(default)]
    pub message: Option<String>,
}

impl LoginResponse {
    /// Creates an accepting login response.
    pub fn success(user: RemoteUser) -> Self {
        Self {
            success: true,
            user: Some(user),
            message: None,
        }
    }

    /// Creates a rejecting login response.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            user: None,
            message: Some(message.into()),
        }
    }
}

/// Generic acknowledgement body (`register` and error responses).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    /// Whether the request was accepted.
    pub success: bool,
    /// Server-supplied message, if any.
    #[serde(default)]
    pub message: Option<String>,
}

impl AckResponse {
    /// Creates an accepting acknowledgement.
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Creates a rejecting acknowledgement with a server message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// An eSIM entitlement as it crosses the wire. No origin tag; that is
/// client-side merge state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EsimWire {
    /// Natural key.
    pub iccid: String,
    /// Owning user's id.
    #[serde(deserialize_with = "opaque_id")]
    pub user_id: String,
    /// Commercial plan name.
    pub plan_name: String,
    /// Data allowance in bytes.
    pub data_limit_bytes: u64,
    /// Entitlement expiry.
    pub valid_until: DateTime<Utc>,
    /// ISO country code of the plan, when known.
    #[serde(default)]
    pub country_code: Option<String>,
    /// Status as last recorded by the sending side.
    pub status: EsimStatus,
}

impl EsimWire {
    /// Builds the wire form of a local record.
    pub fn from_record(record: &EsimEntitlement) -> Self {
        Self {
            iccid: record.iccid.clone(),
            user_id: record.owner_user_id.clone(),
            plan_name: record.plan_name.clone(),
            data_limit_bytes: record.data_limit_bytes,
            valid_until: record.valid_until,
            country_code: record.country_code.clone(),
            status: record.status,
        }
    }

    /// Converts into a domain record with the given origin tag.
    pub fn into_record(self, origin: RecordOrigin) -> EsimEntitlement {
        EsimEntitlement {
            iccid: self.iccid,
            owner_user_id: self.user_id,
            plan_name: self.plan_name,
            data_limit_bytes: self.data_limit_bytes,
            valid_until: self.valid_until,
            country_code: self.country_code,
            status: self.status,
            origin,
        }
    }
}

/// Request body for `POST /esim/auto-sync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum EsimSyncRequest {
    /// Bidirectional exchange: the client's roster goes up, the remote's
    /// authoritative roster comes back.
    #[serde(rename = "full_sync")]
    FullSync {
        /// The client's current roster.
        esims: Vec<EsimWire>,
    },
}

/// Counters reported by the remote after a `full_sync`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsimSyncStats {
    /// Records the remote created from the client's roster.
    #[serde(default)]
    pub added: u64,
    /// Records the remote updated from the client's roster.
    #[serde(default)]
    pub updated: u64,
}

/// Payload of a successful `full_sync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsimSyncData {
    /// The remote's authoritative roster for this client.
    #[serde(rename = "esimsForMobile")]
    pub esims_for_mobile: Vec<EsimWire>,
    /// Exchange counters.
    #[serde(default)]
    pub stats: Option<EsimSyncStats>,
}

/// Response to a `full_sync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsimSyncResponse {
    /// Whether the remote accepted the exchange.
    pub success: bool,
    /// Exchange payload; absent on failure.
    #[serde(default)]
    pub data: Option<EsimSyncData>,
    /// Server-supplied error message, if any.
    #[serde(default)]
    pub message: Option<String>,
}

impl EsimSyncResponse {
    /// Creates a successful exchange response.
    pub fn success(esims_for_mobile: Vec<EsimWire>, stats: EsimSyncStats) -> Self {
        Self {
            success: true,
            data: Some(EsimSyncData {
                esims_for_mobile,
                stats: Some(stats),
            }),
            message: None,
        }
    }

    /// Creates a failed exchange response with a server message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

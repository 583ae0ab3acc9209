//! Record reconciliation.
//!
//! Pure functions: no I/O, no clocks — `now` is an argument. The output is
//! deduplicated by natural key and sorted by it, which re-establishes the
//! uniqueness invariants after every pass and keeps persisted snapshots
//! deterministic.

use chrono::{DateTime, Utc};
use esimsync_model::{EsimEntitlement, EsimWire, RecordOrigin, RemoteUser, User};
use std::collections::BTreeMap;

/// Merges the local user set with a pulled remote set, keyed by email.
///
/// - local-only → kept, tagged `LocalOnly` (push candidate). A record the
///   remote no longer reports is demoted, never deleted.
/// - remote-only → inserted, tagged `RemoteOnly`, with the unusable
///   placeholder credential and `needs_credential_sync` set.
/// - both → [`reconcile_user`]: remote wins for profile fields and id, the
///   local credential is sovereign.
pub fn merge_users(local: &[User], remote: &[RemoteUser]) -> Vec<User> {
    let remote_by_email: BTreeMap<&str, &RemoteUser> =
        remote.iter().map(|r| (r.email.as_str(), r)).collect();

    let mut merged: BTreeMap<String, User> = BTreeMap::new();

    for user in local {
        if merged.contains_key(&user.email) {
            continue;
        }
        let record = match remote_by_email.get(user.email.as_str()) {
            Some(remote_user) => reconcile_user(user, remote_user),
            None => User {
                origin: RecordOrigin::LocalOnly,
                ..user.clone()
            },
        };
        merged.insert(record.email.clone(), record);
    }

    for remote_user in remote {
        if merged.contains_key(&remote_user.email) {
            continue;
        }
        merged.insert(remote_user.email.clone(), discover_user(remote_user));
    }

    merged.into_values().collect()
}

/// Combines a record present on both sides.
///
/// The remote is authoritative for profile fields and the id; the local
/// credential and its sync flag are never touched by a merge. The creation
/// timestamp is immutable and stays local.
pub(crate) fn reconcile_user(local: &User, remote: &RemoteUser) -> User {
    User {
        id: remote.id.clone(),
        email: local.email.clone(),
        credential: local.credential.clone(),
        first_name: remote.first_name.clone(),
        last_name: remote.last_name.clone(),
        created_at: local.created_at,
        origin: RecordOrigin::Reconciled,
        needs_credential_sync: local.needs_credential_sync,
    }
}

/// Builds a local record for a user first seen in a pull. The placeholder
/// credential cannot authenticate until a remote login supplies the real
/// one.
fn discover_user(remote: &RemoteUser) -> User {
    User {
        id: remote.id.clone(),
        email: remote.email.clone(),
        credential: None,
        first_name: remote.first_name.clone(),
        last_name: remote.last_name.clone(),
        created_at: remote.created_at,
        origin: RecordOrigin::RemoteOnly,
        needs_credential_sync: true,
    }
}

/// Merges the local entitlement roster with the remote's, keyed by iccid.
///
/// Plan attributes are remote-authoritative for records present on both
/// sides. Every output record's status is recomputed against `now`, so an
/// entitlement past its validity window is `Expired` no matter what either
/// side last recorded.
pub fn merge_esims(
    local: &[EsimEntitlement],
    remote: &[EsimWire],
    now: DateTime<Utc>,
) -> Vec<EsimEntitlement> {
    let remote_by_iccid: BTreeMap<&str, &EsimWire> =
        remote.iter().map(|r| (r.iccid.as_str(), r)).collect();

    let mut merged: BTreeMap<String, EsimEntitlement> = BTreeMap::new();

    for esim in local {
        if merged.contains_key(&esim.iccid) {
            continue;
        }
        let record = match remote_by_iccid.get(esim.iccid.as_str()) {
            Some(wire) => (*wire).clone().into_record(RecordOrigin::Reconciled),
            None => EsimEntitlement {
                origin: RecordOrigin::LocalOnly,
                ..esim.clone()
            },
        };
        merged.insert(record.iccid.clone(), finalize_status(record, now));
    }

    for wire in remote {
        if merged.contains_key(&wire.iccid) {
            continue;
        }
        let record = wire.clone().into_record(RecordOrigin::RemoteOnly);
        merged.insert(wire.iccid.clone(), finalize_status(record, now));
    }

    merged.into_values().collect()
}

fn finalize_status(mut record: EsimEntitlement, now: DateTime<Utc>) -> EsimEntitlement {
    record.status = record.effective_status(now);
    record
}

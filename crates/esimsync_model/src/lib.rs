//! # esimsync Model
//!
//! Record types and wire messages for the esimsync engine.
//!
//! This crate provides:
//! - Domain records: [`User`], [`EsimEntitlement`], [`Session`]
//! - The [`RecordOrigin`] tag that drives the merge policy
//! - JSON wire messages for the remote sync protocol
//!
//! ## Record origins
//!
//! Every synchronized record carries an origin tag:
//! - `LocalOnly` — created here, not yet known to the remote (push candidate)
//! - `RemoteOnly` — discovered during a pull, never authenticated locally
//! - `Reconciled` — present on both sides
//!
//! The merge engine branches exhaustively on this tag; there are no ad hoc
//! boolean source flags.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod messages;
mod record;

pub use messages::{
    AckResponse, EsimSyncData, EsimSyncRequest, EsimSyncResponse, EsimSyncStats, EsimWire,
    LoginRequest, LoginResponse, PushSummary, RegisterRequest, RemoteUser, SendUsersResponse,
    UserPush, UserSyncRequest, UserSyncResponse,
};
pub use record::{EsimEntitlement, EsimStatus, RecordOrigin, Session, User};

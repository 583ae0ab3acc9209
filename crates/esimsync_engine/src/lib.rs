//! # esimsync Engine
//!
//! Offline-first account and eSIM synchronization for a consumer eSIM
//! marketplace client.
//!
//! This crate provides:
//! - Endpoint discovery over an ordered candidate list with failover caching
//! - Transport with per-request deadlines and aborted (not leaked) timeouts
//! - A pure record-merge policy with credential sovereignty
//! - A periodic, single-flight sync orchestrator
//! - Session management with offline degradation
//!
//! ## Architecture
//!
//! The engine implements a **local-first** model:
//! 1. Every read is answered from the local store, never the network
//! 2. Cycles pull the remote set, merge, persist, then push local-only
//!    records
//! 3. The remote is authoritative for identity and profile fields; local
//!    credentials are sovereign and never overwritten by a merge
//!
//! ## Key invariants
//!
//! - At most one sync cycle runs at a time (single-flight)
//! - `NetworkUnavailable` defers a cycle; it is never an error
//! - Two back-to-back cycles with no remote change leave the store
//!   byte-for-byte identical
//! - Background sync never surfaces errors to callers; login/register do

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod merge;
mod orchestrator;
mod resolver;
mod service;
mod session;
mod transport;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult, ValidationError};
pub use http::{HttpClient, HttpError, HttpResponse, LoopbackClient, LoopbackServer, ReqwestClient};
pub use merge::{merge_esims, merge_users};
pub use orchestrator::{CycleStatus, PhaseReport, SyncCycleResult, SyncOrchestrator, SyncStats};
pub use resolver::EndpointResolver;
pub use service::SyncService;
pub use session::{NewUserProfile, SessionManager, SessionState};
pub use transport::TransportClient;

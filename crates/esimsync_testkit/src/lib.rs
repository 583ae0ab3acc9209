//! # esimsync Testkit
//!
//! Test doubles for the esimsync engine:
//! - [`MockRemote`] - an in-process implementation of the remote HTTP API,
//!   used as the peer for engine integration tests (no sockets involved)
//! - [`fixtures`] - record builders with sensible defaults
//!
//! This crate is a development dependency only; nothing here ships.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
mod remote;

pub use remote::{MockRemote, RemoteResponse};

//! CLI command implementations.

pub mod inspect;
pub mod login;
pub mod register;
pub mod sync;

use esimsync_engine::{ReqwestClient, SyncConfig, SyncService};
use esimsync_store::{FileBackend, LocalStore};
use std::path::Path;

/// Opens the store file and wires a full engine over it.
pub fn open_service(
    store_path: &Path,
    endpoints: Vec<String>,
) -> Result<SyncService<ReqwestClient>, Box<dyn std::error::Error>> {
    let backend = FileBackend::open(store_path)?;
    let store = LocalStore::open(backend)?;
    let config = SyncConfig::new(endpoints);
    Ok(SyncService::new(config, ReqwestClient::new(), store))
}

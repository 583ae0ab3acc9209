//! Inspect command implementation.

use esimsync_store::{FileBackend, LocalStore};
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store file path.
    pub path: String,
    /// Number of user records.
    pub user_count: usize,
    /// Number of entitlement records.
    pub esim_count: usize,
    /// Users still waiting to be pushed.
    pub local_only_users: usize,
    /// Whether a session is present.
    pub has_session: bool,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = LocalStore::open(FileBackend::open(path)?)?;
    let users = store.users();
    let esims = store.esims();

    let result = InspectResult {
        path: path.display().to_string(),
        user_count: users.len(),
        esim_count: esims.len(),
        local_only_users: users.iter().filter(|u| u.origin.is_push_candidate()).count(),
        has_session: store.session().is_some(),
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Store: {}", result.path);
    println!(
        "Users: {} ({} awaiting push)",
        result.user_count, result.local_only_users
    );
    for user in &users {
        println!(
            "  {:<32} {:?}{}",
            user.email,
            user.origin,
            if user.needs_credential_sync {
                "  [needs credential sync]"
            } else {
                ""
            }
        );
    }
    println!("ESims: {}", result.esim_count);
    for esim in &esims {
        println!(
            "  {:<24} {:<20} {:?} until {}",
            esim.iccid,
            esim.plan_name,
            esim.status,
            esim.valid_until.format("%Y-%m-%d")
        );
    }
    match store.session() {
        Some(session) => println!("Session: user {} since {}", session.user_id, session.issued_at),
        None => println!("Session: none"),
    }

    Ok(())
}

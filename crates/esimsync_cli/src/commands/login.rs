//! Login command implementation.

use esimsync_engine::SessionState;
use std::path::Path;

/// Runs the login command.
pub async fn run(
    store_path: &Path,
    endpoints: Vec<String>,
    email: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = super::open_service(store_path, endpoints)?;

    let session = service.session().login(email, password).await?;
    match service.session().state() {
        SessionState::OfflineLoggedIn => {
            println!("Logged in OFFLINE as {email}; identity not verified against the remote");
        }
        _ => println!("Logged in as {email}"),
    }
    println!("Session for user {} issued at {}", session.user_id, session.issued_at);
    Ok(())
}

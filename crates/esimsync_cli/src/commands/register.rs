//! Register command implementation.

use esimsync_engine::NewUserProfile;
use std::path::Path;

/// Runs the register command. Registration is optimistic: with no
/// reachable endpoint the account is created locally and pushed by a later
/// sync.
pub async fn run(
    store_path: &Path,
    endpoints: Vec<String>,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = super::open_service(store_path, endpoints)?;

    let profile = NewUserProfile {
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    };
    let session = service.session().register(profile, password, password).await?;

    let user = service
        .session()
        .current_user()
        .ok_or("session user missing after registration")?;
    println!("Registered {} (origin {:?})", user.email, user.origin);
    println!("Session for user {} issued at {}", session.user_id, session.issued_at);
    if user.origin.is_push_candidate() {
        println!("Remote not reached yet; the record will be pushed on the next sync");
    }
    Ok(())
}

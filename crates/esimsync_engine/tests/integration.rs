//! End-to-end tests: the full engine against an in-process remote.

use async_trait::async_trait;
use esimsync_engine::{
    CycleStatus, HttpClient, HttpError, HttpResponse, LoopbackClient, LoopbackServer,
    NewUserProfile, SessionState, SyncConfig, SyncError, SyncService, ValidationError,
};
use esimsync_model::{EsimStatus, RecordOrigin};
use esimsync_store::LocalStore;
use esimsync_testkit::{fixtures, MockRemote};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// A loopback network in front of the mock remote. Bases start down;
/// requests against a down base fail like a refused connection. Every ping
/// attempt is recorded, reachable or not.
struct Network {
    remote: MockRemote,
    live: RwLock<BTreeSet<String>>,
    probes: Mutex<Vec<String>>,
}

impl Network {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            remote: MockRemote::new(),
            live: RwLock::new(BTreeSet::new()),
            probes: Mutex::new(Vec::new()),
        })
    }

    fn bring_up(&self, base: &str) {
        self.live.write().insert(base.to_string());
    }

    fn take_down_all(&self) {
        self.live.write().clear();
    }

    fn probe_count(&self) -> usize {
        self.probes.lock().len()
    }
}

impl LoopbackServer for Network {
    fn serve(&self, method: &str, url: &str, body: Option<&str>) -> Option<(u16, String)> {
        if url.contains("/ping") {
            self.probes.lock().push(url.to_string());
        }
        let reachable = self.live.read().iter().any(|base| url.starts_with(base.as_str()));
        if !reachable {
            return None;
        }
        let response = self.remote.handle(method, url, body);
        Some((response.status, response.body))
    }
}

const APP: &str = "http://app:3000/api";

fn config(bases: &[&str]) -> SyncConfig {
    SyncConfig::new(bases.iter().map(|b| b.to_string()).collect())
        .with_probe_timeout(Duration::from_millis(100))
        .with_request_timeout(Duration::from_millis(500))
}

fn service(network: &Arc<Network>, bases: &[&str]) -> SyncService<LoopbackClient<Arc<Network>>> {
    SyncService::new(
        config(bases),
        LoopbackClient::new(Arc::clone(network)),
        LocalStore::in_memory(),
    )
}

fn profile(email: &str) -> NewUserProfile {
    NewUserProfile {
        email: email.to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
    }
}

#[tokio::test]
async fn offline_register_pushes_and_reconciles_on_reconnect() {
    let network = Network::new();
    let service = service(&network, &[APP]);

    // Register while nothing is reachable.
    let session = service
        .session()
        .register(profile("a@x.com"), "secret1", "secret1")
        .await
        .unwrap();
    assert_eq!(service.session().state(), SessionState::LoggedIn);
    assert!(!session.user_id.is_empty());

    let user = service.store().user_by_email("a@x.com").unwrap();
    assert_eq!(user.origin, RecordOrigin::LocalOnly);
    assert!(!network.remote.has_user("a@x.com"));

    // Offline cycle defers without error.
    let result = service.session().force_sync_now().await;
    assert_eq!(result.status, CycleStatus::Deferred);
    assert!(!network.remote.has_user("a@x.com"));

    // Connectivity returns; the next cycle pushes and retags.
    network.bring_up(APP);
    let result = service.session().force_sync_now().await;
    assert_eq!(result.status, CycleStatus::Completed);
    assert!(result.is_clean());
    assert_eq!(result.users.pushed, 1);

    assert!(network.remote.has_user("a@x.com"));
    let user = service.store().user_by_email("a@x.com").unwrap();
    assert_eq!(user.origin, RecordOrigin::Reconciled);
}

#[tokio::test]
async fn remote_only_discovery_then_login_clears_flag() {
    let network = Network::new();
    network.remote.seed_user("b@x.com", "secret1", "B", "Remote");
    network.bring_up(APP);

    let service = service(&network, &[APP]);

    // One cycle discovers the remote account.
    let result = service.session().force_sync_now().await;
    assert_eq!(result.status, CycleStatus::Completed);
    assert_eq!(result.users.pulled, 1);

    let user = service.store().user_by_email("b@x.com").unwrap();
    assert_eq!(user.origin, RecordOrigin::RemoteOnly);
    assert!(user.needs_credential_sync);
    assert_eq!(user.credential, None);

    // The placeholder cannot log in locally; the remote verifies and the
    // flag clears exactly once.
    let session = service.session().login("b@x.com", "secret1").await.unwrap();
    assert_eq!(service.session().state(), SessionState::LoggedIn);

    let user = service.store().user_by_email("b@x.com").unwrap();
    assert!(!user.needs_credential_sync);
    assert_eq!(user.origin, RecordOrigin::Reconciled);
    assert!(user.verify_credential("secret1"));
    assert_eq!(session.user_id, user.id);

    // Offline relogin now succeeds from the store alone.
    service.session().logout().unwrap();
    network.take_down_all();
    let probes_before = network.probe_count();

    service.session().login("b@x.com", "secret1").await.unwrap();
    assert_eq!(service.session().state(), SessionState::LoggedIn);
    assert_eq!(network.probe_count(), probes_before);
}

#[tokio::test]
async fn empty_remote_never_deletes_local_users() {
    let network = Network::new();
    network.bring_up(APP);
    network.remote.set_reject_user_push(true);

    let service = service(&network, &[APP]);
    for email in ["a@x.com", "b@x.com", "c@x.com"] {
        service.store().put_user(fixtures::user(email)).unwrap();
    }

    // Empty pull, rejected push: everything stays, still local-only.
    let result = service.session().force_sync_now().await;
    assert_eq!(result.status, CycleStatus::Completed);
    assert_eq!(result.users.pulled, 0);
    assert!(!result.users.failures.is_empty());
    // The entitlement phase is independent of the user-phase failure.
    assert!(result.esims.failures.is_empty());

    let users = service.store().users();
    assert_eq!(users.len(), 3);
    assert!(users.iter().all(|u| u.origin == RecordOrigin::LocalOnly));

    // The next cycle retries the push and reconciles.
    network.remote.set_reject_user_push(false);
    let result = service.session().force_sync_now().await;
    assert!(result.is_clean());
    assert_eq!(result.users.pushed, 3);
    assert!(service
        .store()
        .users()
        .iter()
        .all(|u| u.origin == RecordOrigin::Reconciled));
}

#[tokio::test]
async fn stale_active_esim_expires_after_cycle() {
    let network = Network::new();
    network.bring_up(APP);
    network.remote.seed_esim(&fixtures::expired_esim("8988001", "7"));

    let service = service(&network, &[APP]);
    // A stale local record too.
    service
        .store()
        .put_esim(fixtures::expired_esim("8988002", "7"))
        .unwrap();

    let result = service.session().force_sync_now().await;
    assert_eq!(result.status, CycleStatus::Completed);

    let esims = service.store().esims();
    assert_eq!(esims.len(), 2);
    assert!(esims.iter().all(|e| e.status == EsimStatus::Expired));
}

#[tokio::test]
async fn back_to_back_cycles_are_idempotent() {
    let network = Network::new();
    network.remote.seed_user("web@x.com", "secret1", "Web", "User");
    network.remote.seed_esim(&fixtures::esim("8988001", "1000"));
    network.bring_up(APP);

    let service = service(&network, &[APP]);
    service.store().put_user(fixtures::user("mobile@x.com")).unwrap();

    // First cycle pushes; the second observes the settled remote state.
    service.session().force_sync_now().await;
    service.session().force_sync_now().await;
    let settled = service.store().snapshot().unwrap();

    let result = service.session().force_sync_now().await;
    assert!(result.is_clean());
    assert_eq!(service.store().snapshot().unwrap(), settled);
}

#[tokio::test]
async fn endpoint_failover_caches_the_winner() {
    let network = Network::new();
    network.bring_up(APP);

    let dead_one = "http://dead-one:3000/api";
    let dead_two = "http://dead-two:3000/api";
    let service = service(&network, &[dead_one, dead_two, APP]);

    let result = service.session().force_sync_now().await;
    assert_eq!(result.status, CycleStatus::Completed);
    assert_eq!(network.probe_count(), 3);

    // Second cycle goes straight to the cached endpoint: no new probes.
    let result = service.session().force_sync_now().await;
    assert_eq!(result.status, CycleStatus::Completed);
    assert_eq!(network.probe_count(), 3);
}

#[tokio::test]
async fn offline_login_fast_path_makes_no_network_attempt() {
    let network = Network::new();
    let service = service(&network, &[APP]);
    service.store().put_user(fixtures::user("a@x.com")).unwrap();

    let session = service
        .session()
        .login("a@x.com", fixtures::CREDENTIAL)
        .await
        .unwrap();
    // Full LoggedIn, not the degraded state: the credential verified locally.
    assert_eq!(service.session().state(), SessionState::LoggedIn);
    assert_eq!(network.probe_count(), 0);
    assert_eq!(network.remote.request_count(), 0);
    assert_eq!(service.store().session(), Some(session));
}

#[tokio::test]
async fn offline_login_with_unverified_credential_degrades() {
    let network = Network::new();
    let service = service(&network, &[APP]);
    service.store().put_user(fixtures::user("a@x.com")).unwrap();

    // Wrong credential, nothing reachable, but the email matches a local
    // record: degraded login.
    service.session().login("a@x.com", "not-the-one").await.unwrap();
    assert_eq!(service.session().state(), SessionState::OfflineLoggedIn);
    assert!(service.session().state().is_degraded());
}

#[tokio::test]
async fn offline_login_without_local_record_reports_offline() {
    let network = Network::new();
    let service = service(&network, &[APP]);

    match service.session().login("ghost@x.com", "secret1").await {
        Err(SyncError::NetworkUnavailable) => {}
        other => panic!("expected NetworkUnavailable, got {other:?}"),
    }
    assert_eq!(service.session().state(), SessionState::LoggedOut);
}

#[tokio::test]
async fn rejected_remote_login_is_authentication_failure() {
    let network = Network::new();
    network.remote.seed_user("a@x.com", "secret1", "A", "X");
    network.bring_up(APP);

    let service = service(&network, &[APP]);

    match service.session().login("a@x.com", "wrong-pass").await {
        Err(SyncError::AuthenticationFailed) => {}
        other => panic!("expected AuthenticationFailed, got {other:?}"),
    }
    assert_eq!(service.session().state(), SessionState::LoggedOut);
    assert!(service.store().session().is_none());
}

#[tokio::test]
async fn register_validation_rejects_before_any_network_call() {
    let network = Network::new();
    let service = service(&network, &[APP]);
    service.store().put_user(fixtures::user("taken@x.com")).unwrap();

    let cases = [
        (profile("not-an-email"), "secret1", "secret1"),
        (profile("short@x.com"), "abc", "abc"),
        (profile("mismatch@x.com"), "secret1", "secret2"),
        (profile("taken@x.com"), "secret1", "secret1"),
    ];
    for (profile, credential, confirm) in cases {
        let result = service.session().register(profile, credential, confirm).await;
        assert!(matches!(result, Err(SyncError::Validation(_))));
    }

    // Specific variants for the interesting ones.
    match service
        .session()
        .register(profile("short@x.com"), "abc", "abc")
        .await
    {
        Err(SyncError::Validation(ValidationError::CredentialTooShort { min })) => {
            assert_eq!(min, 6);
        }
        other => panic!("expected CredentialTooShort, got {other:?}"),
    }

    assert_eq!(network.probe_count(), 0);
    assert_eq!(network.remote.request_count(), 0);
}

#[tokio::test]
async fn online_register_reconciles_immediately() {
    let network = Network::new();
    network.bring_up(APP);

    let service = service(&network, &[APP]);
    service
        .session()
        .register(profile("a@x.com"), "secret1", "secret1")
        .await
        .unwrap();

    assert!(network.remote.has_user("a@x.com"));
    let user = service.store().user_by_email("a@x.com").unwrap();
    assert_eq!(user.origin, RecordOrigin::Reconciled);
    assert_eq!(service.session().state(), SessionState::LoggedIn);
}

#[tokio::test]
async fn user_esims_syncs_then_filters_by_owner() {
    let network = Network::new();
    network.remote.seed_user("a@x.com", "secret1", "A", "X");
    let owner_id = network.remote.users()[0].id.clone();
    network
        .remote
        .seed_esim(&fixtures::esim("8988001", &owner_id));
    network.remote.seed_esim(&fixtures::esim("8988002", "someone-else"));
    network.bring_up(APP);

    let service = service(&network, &[APP]);
    service.session().login("a@x.com", "secret1").await.unwrap();

    let esims = service.session().user_esims().await;
    assert_eq!(esims.len(), 1);
    assert_eq!(esims[0].iccid, "8988001");
    assert_eq!(esims[0].owner_user_id, owner_id);
}

#[tokio::test]
async fn logout_clears_session_but_not_records() {
    let network = Network::new();
    let service = service(&network, &[APP]);
    service.store().put_user(fixtures::user("a@x.com")).unwrap();
    service
        .session()
        .login("a@x.com", fixtures::CREDENTIAL)
        .await
        .unwrap();

    service.session().logout().unwrap();
    assert_eq!(service.session().state(), SessionState::LoggedOut);
    assert!(service.store().session().is_none());
    assert!(service.session().current_user().is_none());
    assert_eq!(service.store().users().len(), 1);
}

/// Delays every protocol request so a cycle stays in flight long enough for
/// a second trigger to hit the single-flight guard.
struct SlowClient<C> {
    inner: C,
    delay: Duration,
}

#[async_trait]
impl<C: HttpClient> HttpClient for SlowClient<C> {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError> {
        self.inner.get(url, timeout).await
    }

    async fn post(
        &self,
        url: &str,
        body: String,
        timeout: Duration,
    ) -> Result<HttpResponse, HttpError> {
        tokio::time::sleep(self.delay).await;
        self.inner.post(url, body, timeout).await
    }
}

#[tokio::test]
async fn concurrent_trigger_is_dropped_by_single_flight() {
    let network = Network::new();
    network.bring_up(APP);

    let client = SlowClient {
        inner: LoopbackClient::new(Arc::clone(&network)),
        delay: Duration::from_millis(50),
    };
    let service = SyncService::new(config(&[APP]), client, LocalStore::in_memory());

    let (first, second) = tokio::join!(
        service.orchestrator().run_sync(),
        service.orchestrator().run_sync()
    );

    let statuses = [first.status, second.status];
    assert!(statuses.contains(&CycleStatus::Completed));
    assert!(statuses.contains(&CycleStatus::Skipped));
    assert_eq!(service.orchestrator().stats().cycles_skipped, 1);
}

#[tokio::test]
async fn periodic_sync_runs_and_stops_cleanly() {
    let network = Network::new();
    network.bring_up(APP);

    let service = SyncService::new(
        config(&[APP]).with_sync_interval(Duration::from_millis(25)),
        LoopbackClient::new(Arc::clone(&network)),
        LocalStore::in_memory(),
    );

    service.start();
    assert!(service.orchestrator().is_periodic_running());
    // Second start is a no-op.
    service.start();

    tokio::time::sleep(Duration::from_millis(200)).await;
    let cycles = service.orchestrator().stats().cycles_completed;
    assert!(cycles >= 2, "expected at least 2 cycles, saw {cycles}");

    service.dispose();
    assert!(!service.orchestrator().is_periodic_running());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(service.orchestrator().stats().cycles_completed, cycles);
}

//! In-process mock of the remote sync API.

use chrono::Utc;
use esimsync_model::{
    AckResponse, EsimEntitlement, EsimSyncRequest, EsimSyncResponse, EsimSyncStats, EsimWire,
    LoginRequest, LoginResponse, PushSummary, RegisterRequest, RemoteUser, SendUsersResponse,
    UserSyncRequest, UserSyncResponse,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// A plain HTTP-shaped response from the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: String,
}

/// One account on the mock remote. The password is held server-side only;
/// pull responses never include it.
struct Account {
    user: RemoteUser,
    password: Option<String>,
}

#[derive(Default)]
struct RemoteState {
    accounts: Vec<Account>,
    esims: Vec<EsimWire>,
}

/// An in-memory implementation of the six remote routes.
///
/// Engine tests drive the real transport stack against this mock through a
/// loopback client; no sockets are opened. Probe and request counters let
/// tests assert on network behavior (failover caching, offline fast paths).
#[derive(Default)]
pub struct MockRemote {
    state: Mutex<RemoteState>,
    pings: AtomicUsize,
    requests: AtomicUsize,
    reject_user_push: AtomicBool,
    next_id: AtomicU64,
}

impl MockRemote {
    /// Creates an empty mock remote.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1000),
            ..Self::default()
        }
    }

    /// Seeds an account as if it had been registered on the web side.
    pub fn seed_user(&self, email: &str, password: &str, first_name: &str, last_name: &str) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.state.lock().accounts.push(Account {
            user: RemoteUser {
                id: id.to_string(),
                email: email.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                created_at: Utc::now(),
            },
            password: Some(password.to_string()),
        });
    }

    /// Seeds an entitlement into the remote roster.
    pub fn seed_esim(&self, record: &EsimEntitlement) {
        self.state.lock().esims.push(EsimWire::from_record(record));
    }

    /// Returns the remote user set, as a pull would.
    pub fn users(&self) -> Vec<RemoteUser> {
        self.state.lock().accounts.iter().map(|a| a.user.clone()).collect()
    }

    /// Returns the remote entitlement roster.
    pub fn esims(&self) -> Vec<EsimWire> {
        self.state.lock().esims.clone()
    }

    /// True if an account with this email exists.
    pub fn has_user(&self, email: &str) -> bool {
        self.state.lock().accounts.iter().any(|a| a.user.email == email)
    }

    /// Number of `/ping` probes served.
    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    /// Number of non-ping requests served.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Makes subsequent `send_users` pushes fail with a server message.
    pub fn set_reject_user_push(&self, reject: bool) {
        self.reject_user_push.store(reject, Ordering::SeqCst);
    }

    /// Serves one request. `url` is matched by path; the base address part
    /// is ignored so any resolved candidate routes here.
    pub fn handle(&self, method: &str, url: &str, body: Option<&str>) -> RemoteResponse {
        if url.contains("/ping") {
            self.pings.fetch_add(1, Ordering::SeqCst);
            return json(200, &AckResponse::ok());
        }

        self.requests.fetch_add(1, Ordering::SeqCst);

        if method != "POST" {
            return json(405, &AckResponse::error("method not allowed"));
        }
        let body = body.unwrap_or("");

        if url.contains("/auth/sync") {
            return match serde_json::from_str::<UserSyncRequest>(body) {
                Ok(UserSyncRequest::GetUsers) => json(200, &UserSyncResponse::success(self.users())),
                Ok(UserSyncRequest::SendUsers { users }) => self.handle_send_users(users),
                Err(_) => json(400, &AckResponse::error("malformed sync request")),
            };
        }
        if url.contains("/auth/register") {
            return match serde_json::from_str::<RegisterRequest>(body) {
                Ok(request) => self.handle_register(request),
                Err(_) => json(400, &AckResponse::error("malformed register request")),
            };
        }
        if url.contains("/auth/login") {
            return match serde_json::from_str::<LoginRequest>(body) {
                Ok(request) => self.handle_login(request),
                Err(_) => json(400, &AckResponse::error("malformed login request")),
            };
        }
        if url.contains("/esim/auto-sync") {
            return match serde_json::from_str::<EsimSyncRequest>(body) {
                Ok(EsimSyncRequest::FullSync { esims }) => self.handle_full_sync(esims),
                Err(_) => json(400, &AckResponse::error("malformed esim sync request")),
            };
        }

        json(404, &AckResponse::error("not found"))
    }

    fn handle_send_users(&self, users: Vec<esimsync_model::UserPush>) -> RemoteResponse {
        if self.reject_user_push.load(Ordering::SeqCst) {
            return json(409, &SendUsersResponse::failure("push rejected"));
        }

        let mut summary = PushSummary::default();
        let mut state = self.state.lock();
        for push in users {
            if state.accounts.iter().any(|a| a.user.email == push.email) {
                summary.existing += 1;
                continue;
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            state.accounts.push(Account {
                user: RemoteUser {
                    id: id.to_string(),
                    email: push.email,
                    first_name: push.first_name,
                    last_name: push.last_name,
                    created_at: Utc::now(),
                },
                password: Some(push.password),
            });
            summary.added += 1;
        }
        json(200, &SendUsersResponse::success(summary))
    }

    fn handle_register(&self, request: RegisterRequest) -> RemoteResponse {
        let mut state = self.state.lock();
        if state.accounts.iter().any(|a| a.user.email == request.email) {
            return json(409, &AckResponse::error("email already registered"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        state.accounts.push(Account {
            user: RemoteUser {
                id: id.to_string(),
                email: request.email,
                first_name: request.first_name,
                last_name: request.last_name,
                created_at: Utc::now(),
            },
            password: Some(request.password),
        });
        json(200, &AckResponse::ok())
    }

    fn handle_login(&self, request: LoginRequest) -> RemoteResponse {
        let state = self.state.lock();
        let account = state
            .accounts
            .iter()
            .find(|a| a.user.email == request.email);

        match account {
            Some(account) if account.password.as_deref() == Some(&request.password) => {
                json(200, &LoginResponse::success(account.user.clone()))
            }
            _ => json(401, &LoginResponse::failure("invalid email or password")),
        }
    }

    fn handle_full_sync(&self, client_esims: Vec<EsimWire>) -> RemoteResponse {
        let mut stats = EsimSyncStats::default();
        let mut state = self.state.lock();
        for incoming in client_esims {
            match state.esims.iter_mut().find(|e| e.iccid == incoming.iccid) {
                Some(existing) => {
                    *existing = incoming;
                    stats.updated += 1;
                }
                None => {
                    state.esims.push(incoming);
                    stats.added += 1;
                }
            }
        }
        json(200, &EsimSyncResponse::success(state.esims.clone(), stats))
    }
}

fn json(status: u16, body: &impl Serialize) -> RemoteResponse {
    RemoteResponse {
        status,
        body: serde_json::to_string(body).expect("mock responses serialize"),
    }
}

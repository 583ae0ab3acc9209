//! Protocol-level transport over the resolved endpoint.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::http::{HttpClient, HttpError, HttpResponse};
use crate::resolver::EndpointResolver;
use esimsync_model::{
    AckResponse, EsimSyncRequest, EsimSyncResponse, EsimWire, LoginRequest, LoginResponse,
    PushSummary, RegisterRequest, RemoteUser, SendUsersResponse, UserPush, UserSyncRequest,
    UserSyncResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Issues single logical requests against the resolved endpoint and
/// classifies outcomes into the engine's error taxonomy.
///
/// Idempotent reads may be silently retried once against the next resolved
/// candidate after a transport-level failure. Non-idempotent calls
/// (`register`, `send_users`, `login`) are attempted once per cycle; the
/// merge engine's dedup makes next-cycle retries safe.
pub struct TransportClient<C: HttpClient> {
    client: Arc<C>,
    resolver: EndpointResolver<C>,
    request_timeout: Duration,
}

impl<C: HttpClient> TransportClient<C> {
    /// Creates a transport over the configured candidate list.
    pub fn new(client: Arc<C>, config: &SyncConfig) -> Self {
        let resolver = EndpointResolver::new(
            Arc::clone(&client),
            config.endpoints.clone(),
            config.probe_timeout,
        );
        Self {
            client,
            resolver,
            request_timeout: config.request_timeout,
        }
    }

    /// Resolves a reachable endpoint without issuing a request.
    ///
    /// The orchestrator calls this first so an offline cycle defers before
    /// any protocol traffic.
    pub async fn ensure_endpoint(&self) -> SyncResult<String> {
        self.resolver.resolve().await
    }

    /// Pulls the remote user set. Idempotent.
    pub async fn fetch_remote_users(&self) -> SyncResult<Vec<RemoteUser>> {
        let response: UserSyncResponse = self
            .post_json("/auth/sync", &UserSyncRequest::GetUsers, true)
            .await?;
        if !response.success {
            return Err(SyncError::Rejected(server_message(response.message)));
        }
        Ok(response.users.unwrap_or_default())
    }

    /// Pushes locally-created users. Attempted once per cycle.
    pub async fn push_users(&self, users: Vec<UserPush>) -> SyncResult<PushSummary> {
        let response: SendUsersResponse = self
            .post_json("/auth/sync", &UserSyncRequest::SendUsers { users }, false)
            .await?;
        if !response.success {
            return Err(SyncError::Rejected(server_message(response.message)));
        }
        Ok(response.result.unwrap_or_default())
    }

    /// Registers an account on the remote. Attempted once.
    pub async fn register(&self, request: &RegisterRequest) -> SyncResult<()> {
        let response: AckResponse = self.post_json("/auth/register", request, false).await?;
        if !response.success {
            return Err(SyncError::Rejected(server_message(response.message)));
        }
        Ok(())
    }

    /// Authenticates against the remote. Attempted once.
    pub async fn login(&self, email: &str, credential: &str) -> SyncResult<RemoteUser> {
        let request = LoginRequest {
            email: email.to_string(),
            password: credential.to_string(),
        };
        let response: LoginResponse = self.post_json("/auth/login", &request, false).await?;
        if !response.success {
            return Err(SyncError::Rejected(server_message(response.message)));
        }
        response
            .user
            .ok_or_else(|| SyncError::MalformedResponse("login response without user".into()))
    }

    /// Exchanges the entitlement roster bidirectionally. Idempotent: the
    /// request carries the full local roster and the response returns the
    /// remote's authoritative one.
    pub async fn full_sync_esims(&self, esims: Vec<EsimWire>) -> SyncResult<Vec<EsimWire>> {
        let response: EsimSyncResponse = self
            .post_json("/esim/auto-sync", &EsimSyncRequest::FullSync { esims }, true)
            .await?;
        if !response.success {
            return Err(SyncError::Rejected(server_message(response.message)));
        }
        Ok(response
            .data
            .map(|data| data.esims_for_mobile)
            .unwrap_or_default())
    }

    /// Sends one logical POST and decodes the response.
    ///
    /// On a transport-level failure the cached endpoint is invalidated;
    /// idempotent requests then get one more attempt against whatever the
    /// resolver finds next.
    async fn post_json<Req, Res>(&self, path: &str, request: &Req, idempotent: bool) -> SyncResult<Res>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let body = serde_json::to_string(request)
            .map_err(|err| SyncError::transport_fatal(format!("encode request: {err}")))?;

        let mut attempts_left = if idempotent { 2 } else { 1 };
        loop {
            let base = self.resolver.resolve().await?;
            let url = format!("{base}{path}");

            match self.client.post(&url, body.clone(), self.request_timeout).await {
                Ok(response) => return decode(response),
                Err(err) => {
                    self.resolver.invalidate();
                    attempts_left -= 1;
                    if attempts_left == 0 {
                        return Err(match err {
                            HttpError::TimedOut => SyncError::Timeout,
                            HttpError::Connect(message) => SyncError::transport_retryable(message),
                        });
                    }
                    tracing::debug!(%url, ?err, "request failed, retrying against next candidate");
                }
            }
        }
    }
}

/// Classifies a raw response: 2xx bodies must decode as `Res`; non-2xx
/// bodies are rejections, preferring the server's own message when the
/// error body parses.
fn decode<Res: DeserializeOwned>(response: HttpResponse) -> SyncResult<Res> {
    if response.is_success() {
        serde_json::from_str(&response.body)
            .map_err(|err| SyncError::MalformedResponse(err.to_string()))
    } else {
        let message = serde_json::from_str::<AckResponse>(&response.body)
            .ok()
            .and_then(|ack| ack.message)
            .unwrap_or_else(|| format!("http {}", response.status));
        Err(SyncError::Rejected(message))
    }
}

fn server_message(message: Option<String>) -> String {
    message.unwrap_or_else(|| "request rejected".to_string())
}

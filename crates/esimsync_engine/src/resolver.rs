//! Endpoint discovery over an ordered candidate list.

use crate::error::{SyncError, SyncResult};
use crate::http::HttpClient;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Finds the first reachable base address among an ordered candidate list.
///
/// A candidate is reachable when `GET {base}/ping` answers with any 2xx
/// within the probe deadline. The first success is cached as last-known-good
/// for the process lifetime; later [`resolve`](EndpointResolver::resolve)
/// calls return it immediately without re-probing. The transport invalidates
/// the cache when a request against the cached address fails, after which
/// the next resolve probes the full list again.
///
/// There are no retries within a candidate; trying the next candidate is the
/// only retry strategy at this layer.
pub struct EndpointResolver<C: HttpClient> {
    client: Arc<C>,
    candidates: Vec<String>,
    probe_timeout: Duration,
    last_good: Mutex<Option<String>>,
}

impl<C: HttpClient> EndpointResolver<C> {
    /// Creates a resolver over the given candidates.
    pub fn new(client: Arc<C>, candidates: Vec<String>, probe_timeout: Duration) -> Self {
        Self {
            client,
            candidates,
            probe_timeout,
            last_good: Mutex::new(None),
        }
    }

    /// Returns a reachable base address.
    ///
    /// # Errors
    ///
    /// [`SyncError::NetworkUnavailable`] when every candidate fails or times
    /// out. Callers must treat this as a normal outcome, not a failure.
    pub async fn resolve(&self) -> SyncResult<String> {
        if let Some(base) = self.last_good.lock().clone() {
            return Ok(base);
        }

        for candidate in &self.candidates {
            if self.probe(candidate).await {
                tracing::debug!(endpoint = %candidate, "endpoint reachable");
                *self.last_good.lock() = Some(candidate.clone());
                return Ok(candidate.clone());
            }
        }

        Err(SyncError::NetworkUnavailable)
    }

    /// Probes one candidate, bounded by the probe deadline. The client
    /// aborts the in-flight call on expiry; the resolver moves on.
    async fn probe(&self, base: &str) -> bool {
        let url = format!("{base}/ping");
        match self.client.get(&url, self.probe_timeout).await {
            Ok(response) => response.is_success(),
            Err(err) => {
                tracing::debug!(endpoint = %base, ?err, "probe failed");
                false
            }
        }
    }

    /// Forgets the cached address; the next resolve probes from scratch.
    pub fn invalidate(&self) {
        self.last_good.lock().take();
    }

    /// Returns the cached last-known-good address, if any.
    pub fn cached(&self) -> Option<String> {
        self.last_good.lock().clone()
    }
}

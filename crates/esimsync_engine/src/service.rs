//! Engine assembly and lifecycle.

use crate::config::SyncConfig;
use crate::http::HttpClient;
use crate::orchestrator::SyncOrchestrator;
use crate::session::SessionManager;
use crate::transport::TransportClient;
use esimsync_store::LocalStore;
use std::sync::Arc;

/// One explicit engine instance constructed with its dependencies.
///
/// Owns the transport, orchestrator and session manager over a shared
/// store; there is no global state. `start` brings up the periodic timer
/// (first cycle fires immediately), `dispose` tears it down — and so does
/// dropping the service.
pub struct SyncService<C: HttpClient> {
    config: SyncConfig,
    store: Arc<LocalStore>,
    orchestrator: Arc<SyncOrchestrator<C>>,
    session: SessionManager<C>,
}

impl<C: HttpClient + 'static> SyncService<C> {
    /// Wires the engine together over the given HTTP client and store.
    pub fn new(config: SyncConfig, client: C, store: LocalStore) -> Self {
        let store = Arc::new(store);
        let client = Arc::new(client);
        let transport = Arc::new(TransportClient::new(client, &config));
        let orchestrator = Arc::new(SyncOrchestrator::new(
            Arc::clone(&transport),
            Arc::clone(&store),
        ));
        let session = SessionManager::new(
            Arc::clone(&store),
            transport,
            Arc::clone(&orchestrator),
            &config,
        );

        Self {
            config,
            store,
            orchestrator,
            session,
        }
    }

    /// Starts periodic synchronization at the configured interval.
    pub fn start(&self) {
        Arc::clone(&self.orchestrator).start_periodic(self.config.sync_interval);
    }

    /// Stops the periodic timer and aborts any in-flight cycle.
    pub fn dispose(&self) {
        self.orchestrator.stop();
    }

    /// The consumer-facing entry point.
    pub fn session(&self) -> &SessionManager<C> {
        &self.session
    }

    /// The cycle driver, for on-demand syncs and stats.
    pub fn orchestrator(&self) -> &Arc<SyncOrchestrator<C>> {
        &self.orchestrator
    }

    /// The shared local store.
    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }
}

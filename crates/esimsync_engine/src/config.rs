//! Configuration for the sync engine.

use std::time::Duration;

/// Configuration for the sync engine.
///
/// The candidate list is the only place in the engine that knows concrete
/// addresses; every network-touching component goes through the resolver.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Ordered endpoint candidates, tried first to last.
    pub endpoints: Vec<String>,
    /// Deadline for a single reachability probe.
    pub probe_timeout: Duration,
    /// Deadline for a single logical request.
    pub request_timeout: Duration,
    /// Interval between periodic sync cycles.
    pub sync_interval: Duration,
    /// Minimum accepted credential length at registration.
    pub min_credential_len: usize,
}

impl SyncConfig {
    /// Creates a configuration with the given candidate endpoints.
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            probe_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(10),
            sync_interval: Duration::from_secs(90),
            min_credential_len: 6,
        }
    }

    /// The default candidate list for a development device: the Android
    /// emulator's host loopback first, then plain loopback.
    pub fn default_endpoints() -> Vec<String> {
        vec![
            "http://10.0.2.2:3000/api".to_string(),
            "http://127.0.0.1:3000/api".to_string(),
            "http://localhost:3000/api".to_string(),
        ]
    }

    /// Sets the probe deadline.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets the request deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the periodic sync interval.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Sets the minimum credential length.
    pub fn with_min_credential_len(mut self, min: usize) -> Self {
        self.min_credential_len = min;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(Self::default_endpoints())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides() {
        let config = SyncConfig::new(vec!["http://sync.example.com".into()])
            .with_probe_timeout(Duration::from_secs(5))
            .with_request_timeout(Duration::from_secs(30))
            .with_sync_interval(Duration::from_secs(120))
            .with_min_credential_len(8);

        assert_eq!(config.endpoints, vec!["http://sync.example.com"]);
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.sync_interval, Duration::from_secs(120));
        assert_eq!(config.min_credential_len, 8);
    }

    #[test]
    fn default_candidates_prefer_emulator_loopback() {
        let endpoints = SyncConfig::default_endpoints();
        assert_eq!(endpoints[0], "http://10.0.2.2:3000/api");
        assert!(endpoints.len() > 1);
    }
}

// Prometheus counters for authentication outcomes

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Authentication metrics registry
///
/// `keeper_auth_requests_total{flow, outcome}` separates client-caused
/// outcomes (duplicate_login, authentication_failed, ...) from infrastructure
/// faults (storage_error, token_signing_error).
pub struct AuthMetrics {
    registry: Registry,
    requests: IntCounterVec,
}

impl AuthMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let requests = IntCounterVec::new(
            Opts::new("keeper_auth_requests_total", "Authentication requests by flow and outcome"),
            &["flow", "outcome"],
        )?;
        registry.register(Box::new(requests.clone()))?;
        Ok(Self { registry, requests })
    }

    /// Count one finished request
    pub fn record(&self, flow: &str, outcome: &str) {
        self.requests.with_label_values(&[flow, outcome]).inc();
    }

    /// Current count for a label pair
    pub fn count(&self, flow: &str, outcome: &str) -> u64 {
        self.requests.with_label_values(&[flow, outcome]).get()
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

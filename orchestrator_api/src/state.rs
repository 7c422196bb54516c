//! API server state.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use orchestrator_core::ActionOrchestrator;

/// Shared state for the API server.
#[derive(Clone)]
pub struct ApiState {
    /// Sequences every tenant request.
    pub orchestrator: Arc<ActionOrchestrator>,
    /// Renders `/metrics`; absent when no recorder was installed.
    pub metrics: Option<PrometheusHandle>,
}

impl ApiState {
    pub fn new(orchestrator: Arc<ActionOrchestrator>) -> Self {
        Self {
            orchestrator,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

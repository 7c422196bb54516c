//! Action and command metrics.
//!
//! Recorded through the `metrics` facade, so they are no-ops until a
//! recorder is installed. The API binary installs the Prometheus recorder and
//! serves [`PrometheusHandle::render`] on `/metrics`.

use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const ACTIONS_TOTAL: &str = "facade_actions_total";
pub const COMMAND_DURATION_SECONDS: &str = "facade_command_duration_seconds";

#[derive(Debug, thiserror::Error)]
#[error("failed to install metrics recorder: {0}")]
pub struct MetricsError(String);

/// Terminal state of an orchestrated action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    Blocked,
    Rejected,
    Failed,
}

impl ActionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionOutcome::Completed => "completed",
            ActionOutcome::Blocked => "blocked",
            ActionOutcome::Rejected => "rejected",
            ActionOutcome::Failed => "failed",
        }
    }
}

/// Named recording points.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeMetrics;

impl FacadeMetrics {
    pub fn record_action(&self, action: &'static str, outcome: ActionOutcome) {
        counter!(ACTIONS_TOTAL, "action" => action, "outcome" => outcome.as_str()).increment(1);
    }

    pub fn record_command(&self, command: &'static str, elapsed: Duration) {
        histogram!(COMMAND_DURATION_SECONDS, "command" => command).record(elapsed.as_secs_f64());
    }
}

/// Install the Prometheus recorder as the global recorder.
pub fn install_prometheus() -> Result<PrometheusHandle, MetricsError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError(e.to_string()))
}

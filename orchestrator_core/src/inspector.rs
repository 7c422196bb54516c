//! State Inspector.
//!
//! Fetches live status fresh on every call; nothing is cached. A status that
//! cannot be fetched or parsed is a hard failure and is never read as
//! "not busy".

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use command_runner_interface::{CommandError, CommandRunner, ControlCommand};
use observability::FacadeMetrics;

pub use orchestrator_shared_types::TASK_STATE_FIELD;

use crate::error::{CoreError, Result};

/// Provider-reported status of a compute resource.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveStatus {
    /// The full status document, unmodified.
    pub raw: Value,
    /// Transition-blocking indicator; `None` when absent, null or empty.
    pub task_state: Option<String>,
}

impl LiveStatus {
    pub fn from_document(raw: Value) -> Self {
        let task_state = match raw.get(TASK_STATE_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };
        Self { raw, task_state }
    }

    pub fn is_busy(&self) -> bool {
        self.task_state.is_some()
    }
}

/// Queries live status through the command runner.
pub struct StateInspector {
    runner: Arc<dyn CommandRunner>,
    metrics: FacadeMetrics,
}

impl StateInspector {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            metrics: FacadeMetrics,
        }
    }

    /// Current status of the named server.
    pub async fn current_state(&self, server: &str) -> Result<LiveStatus> {
        let command = ControlCommand::ServerShow {
            server: server.to_string(),
        };
        let raw = self.query(&command, "VM status").await?;
        let status = LiveStatus::from_document(raw);
        debug!(server, task_state = ?status.task_state, "Fetched live status");
        Ok(status)
    }

    /// Status of a tenant namespace, passed through as an opaque document.
    pub async fn namespace_status(&self, tenant: &str) -> Result<Value> {
        let command = ControlCommand::GetNamespace {
            name: tenant.to_string(),
        };
        self.query(&command, "namespace details").await
    }

    async fn query(&self, command: &ControlCommand, what: &str) -> Result<Value> {
        let started = Instant::now();
        let result = self.runner.run_action(command).await;
        self.metrics.record_command(command.label(), started.elapsed());

        let output = result.map_err(|e| {
            warn!("{} failed: {}", command, e);
            classify_query_failure(e, what)
        })?;

        serde_json::from_str(&output.stdout)
            .map_err(|e| CoreError::upstream(format!("Failed to parse {what}: {e}")))
    }
}

/// Shell exit statuses for "found but not executable" and "command not found".
const LAUNCH_FAILURE_STATUSES: [i32; 2] = [126, 127];

/// Markers the provider and control-plane CLIs print for an absent resource.
const ABSENT_MARKERS: [&str; 2] = ["(NotFound)", "No server with a name or ID"];

/// A query that ran and reported the resource as absent is a not-found;
/// anything else, including a CLI that could not be launched, means the
/// upstream could not answer.
fn classify_query_failure(err: CommandError, what: &str) -> CoreError {
    if let CommandError::Failed {
        stderr,
        exit_status,
        ..
    } = &err
    {
        let launched = !matches!(exit_status, Some(code) if LAUNCH_FAILURE_STATUSES.contains(code));
        let absent = ABSENT_MARKERS.iter().any(|marker| stderr.contains(marker));
        if launched && absent {
            return CoreError::NotFound(stderr.trim().to_string());
        }
    }
    CoreError::upstream(format!("Failed to fetch {what}: {err}"))
}

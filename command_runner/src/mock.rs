//! Recording command runner for tests.
//!
//! Nothing is executed. Every call is recorded, manifest contents are
//! captured at apply time (transient files are gone by the time a test
//! looks), and replies can be scripted per command.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use command_runner_interface::{CommandError, CommandOutput, CommandRunner, ControlCommand};
use orchestrator_shared_types::TASK_STATE_FIELD;

#[derive(Default)]
struct MockState {
    applied: Vec<(PathBuf, String)>,
    actions: Vec<ControlCommand>,
    server_status: Option<String>,
    namespace_status: Option<String>,
    action_output: HashMap<&'static str, String>,
    apply_output: String,
    apply_failure: Option<CommandError>,
    action_failures: HashMap<&'static str, CommandError>,
}

/// In-memory runner that records invocations.
#[derive(Default)]
pub struct MockRunner {
    state: Mutex<MockState>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Raw stdout returned for `ServerShow`.
    pub fn with_server_status(self, json: impl Into<String>) -> Self {
        self.state().server_status = Some(json.into());
        self
    }

    /// Report the server as mid-transition.
    pub fn with_task_state(self, task_state: &str) -> Self {
        let json = format!(
            r#"{{"name":"vm","status":"SHUTOFF","{TASK_STATE_FIELD}":"{task_state}"}}"#
        );
        self.with_server_status(json)
    }

    /// Raw stdout returned for `GetNamespace`.
    pub fn with_namespace_status(self, json: impl Into<String>) -> Self {
        self.state().namespace_status = Some(json.into());
        self
    }

    /// Stdout for any action with the given label.
    pub fn with_action_output(self, label: &'static str, stdout: impl Into<String>) -> Self {
        self.state().action_output.insert(label, stdout.into());
        self
    }

    pub fn with_apply_output(self, stdout: impl Into<String>) -> Self {
        self.state().apply_output = stdout.into();
        self
    }

    pub fn fail_apply(self, error: CommandError) -> Self {
        self.state().apply_failure = Some(error);
        self
    }

    pub fn fail_action(self, label: &'static str, error: CommandError) -> Self {
        self.state().action_failures.insert(label, error);
        self
    }

    /// Number of apply invocations.
    pub fn apply_count(&self) -> usize {
        self.state().applied.len()
    }

    /// Paths passed to apply, in call order.
    pub fn applied_paths(&self) -> Vec<PathBuf> {
        self.state().applied.iter().map(|(p, _)| p.clone()).collect()
    }

    /// File contents seen at apply time, in call order.
    pub fn applied_documents(&self) -> Vec<String> {
        self.state().applied.iter().map(|(_, c)| c.clone()).collect()
    }

    /// Control commands run, in call order.
    pub fn actions(&self) -> Vec<ControlCommand> {
        self.state().actions.clone()
    }

    /// Commands that change state, i.e. everything except status queries.
    pub fn mutating_actions(&self) -> Vec<ControlCommand> {
        self.actions()
            .into_iter()
            .filter(|c| {
                !matches!(
                    c,
                    ControlCommand::ServerShow { .. } | ControlCommand::GetNamespace { .. }
                )
            })
            .collect()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn apply_manifest(&self, path: &Path) -> Result<CommandOutput, CommandError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CommandError::Failed {
                command: format!("kubectl apply -f {}", path.display()),
                exit_status: Some(1),
                stderr: format!("error: the path \"{}\" does not exist: {e}", path.display()),
            })?;

        let mut state = self.state();
        state.applied.push((path.to_path_buf(), content));
        if let Some(err) = &state.apply_failure {
            return Err(err.clone());
        }
        Ok(CommandOutput::stdout(state.apply_output.clone()))
    }

    async fn run_action(&self, command: &ControlCommand) -> Result<CommandOutput, CommandError> {
        let mut state = self.state();
        state.actions.push(command.clone());

        if let Some(err) = state.action_failures.get(command.label()) {
            return Err(err.clone());
        }

        let stdout = match command {
            ControlCommand::ServerShow { server } => state
                .server_status
                .clone()
                .unwrap_or_else(|| format!(r#"{{"name":"{server}","status":"ACTIVE","{TASK_STATE_FIELD}":null}}"#)),
            ControlCommand::GetNamespace { name } => state.namespace_status.clone().unwrap_or_else(|| {
                format!(
                    r#"{{"apiVersion":"v1","kind":"Namespace","metadata":{{"name":"{name}"}},"status":{{"phase":"Active"}}}}"#
                )
            }),
            other => state
                .action_output
                .get(other.label())
                .cloned()
                .unwrap_or_default(),
        };

        Ok(CommandOutput::stdout(stdout))
    }
}

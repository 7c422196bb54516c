//! Command Runner capability.
//!
//! The control plane and the cloud provider are only reachable by running
//! external processes. This trait is the seam: the orchestrator hands it
//! manifest files to apply and control commands to run, and tests swap in a
//! recording double.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

pub use orchestrator_shared_types::ControlCommand;

/// Captured streams of a finished external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Errors from running an external command.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommandError {
    /// The process could not be spawned at all.
    #[error("failed to start '{program}': {message}")]
    Spawn { program: String, message: String },

    /// The process ran and exited unsuccessfully. `stderr` is kept verbatim.
    #[error("'{command}' exited with {}: {stderr}", describe_status(.exit_status))]
    Failed {
        command: String,
        exit_status: Option<i32>,
        stderr: String,
    },

    #[error("'{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "no status (killed by signal)".to_string(),
    }
}

impl CommandError {
    /// Exit status, when the process ran to completion.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            CommandError::Failed { exit_status, .. } => *exit_status,
            _ => None,
        }
    }

    /// Diagnostic stream of the failed command, or the launch error.
    pub fn stderr(&self) -> String {
        match self {
            CommandError::Failed { stderr, .. } => stderr.clone(),
            other => other.to_string(),
        }
    }
}

/// Runs commands against the external reconciler and provider.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Invoke the reconciler's apply verb on a manifest file already on disk.
    async fn apply_manifest(&self, path: &Path) -> Result<CommandOutput, CommandError>;

    /// Run an imperative command, capturing stdout and stderr separately.
    async fn run_action(&self, command: &ControlCommand) -> Result<CommandOutput, CommandError>;
}

//! Error taxonomy of the orchestration layer.
//!
//! Every error is terminal for the request; nothing in this crate retries.

use std::path::PathBuf;

use command_runner_interface::CommandError;
use orchestrator_shared_types::{ManifestError, NameError};

/// Coarse classification used by callers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Upstream,
    Execution,
    Malformed,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Missing or invalid request field.
    #[error("{0}")]
    Validation(String),

    /// Referenced resource or manifest is absent.
    #[error("{0}")]
    NotFound(String),

    /// Resource is mid-transition; nothing was issued against it.
    #[error("VM '{resource}' is currently busy (task_state: {task_state}). Try again later.")]
    Conflict { resource: String, task_state: String },

    /// A status query could not run or returned unparsable output.
    #[error("{message}")]
    UpstreamUnavailable { message: String },

    /// An external command failed. `stderr` is verbatim.
    #[error("{command} failed ({}): {stderr}", exit_label(.exit_status))]
    Execution {
        command: String,
        exit_status: Option<i32>,
        stderr: String,
    },

    /// A stored manifest lacks the expected structure.
    #[error("malformed manifest {manifest}: {source}")]
    MalformedManifest {
        /// File path or resource name of the offending manifest.
        manifest: String,
        #[source]
        source: ManifestError,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A failure annotated with the action and its target.
    #[error("Failed to {action} '{target}': {source}")]
    Action {
        action: String,
        target: String,
        #[source]
        source: Box<CoreError>,
    },
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "did not exit".to_string(),
    }
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        CoreError::UpstreamUnavailable {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap with the action that was being attempted.
    pub fn annotate(self, action: impl Into<String>, target: impl Into<String>) -> Self {
        CoreError::Action {
            action: action.into(),
            target: target.into(),
            source: Box::new(self),
        }
    }

    /// Classification, looking through annotations.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Conflict { .. } => ErrorKind::Conflict,
            CoreError::UpstreamUnavailable { .. } => ErrorKind::Upstream,
            CoreError::Execution { .. } => ErrorKind::Execution,
            CoreError::MalformedManifest { .. } => ErrorKind::Malformed,
            CoreError::Io { .. } => ErrorKind::Internal,
            CoreError::Action { source, .. } => source.kind(),
        }
    }
}

impl From<CommandError> for CoreError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Failed {
                command,
                exit_status,
                stderr,
            } => CoreError::Execution {
                command,
                exit_status,
                stderr,
            },
            CommandError::Spawn { ref program, .. } => CoreError::Execution {
                command: program.clone(),
                exit_status: None,
                stderr: err.to_string(),
            },
            CommandError::Timeout { ref command, .. } => CoreError::Execution {
                command: command.clone(),
                exit_status: None,
                stderr: err.to_string(),
            },
        }
    }
}

impl From<NameError> for CoreError {
    fn from(err: NameError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

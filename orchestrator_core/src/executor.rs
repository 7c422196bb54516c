//! Apply Executor.
//!
//! `apply` writes a manifest and invokes the reconciler's apply verb. It
//! guarantees only that the document was written and accepted; it does not
//! wait for the reconciler to converge. Callers poll status to confirm.
//!
//! `run` issues one imperative control command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use command_runner_interface::{CommandOutput, CommandRunner, ControlCommand};
use observability::FacadeMetrics;
use orchestrator_shared_types::ResourceManifest;

use crate::error::{CoreError, Result};

/// Outcome of an apply.
#[derive(Debug, Clone)]
pub struct ApplyResult {
    pub path: PathBuf,
    pub output: CommandOutput,
}

/// Outcome of an imperative command.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub command: ControlCommand,
    pub stdout: String,
    pub stderr: String,
}

/// Removes a transient manifest file when dropped, whatever the outcome.
struct TransientFile {
    path: PathBuf,
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed transient manifest {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

pub struct ApplyExecutor {
    runner: Arc<dyn CommandRunner>,
    metrics: FacadeMetrics,
}

impl ApplyExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            metrics: FacadeMetrics,
        }
    }

    /// Write `manifest` to `path`, replacing any previous content, and apply it.
    pub async fn apply(&self, manifest: &ResourceManifest, path: &Path) -> Result<ApplyResult> {
        let document = manifest.to_yaml().map_err(|source| CoreError::MalformedManifest {
            manifest: path.display().to_string(),
            source,
        })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::io(parent, e))?;
        }
        tokio::fs::write(path, document)
            .await
            .map_err(|e| CoreError::io(path, e))?;

        let started = Instant::now();
        let result = self.runner.apply_manifest(path).await;
        self.metrics.record_command("apply", started.elapsed());

        let output = result?;
        info!(
            kind = manifest.kind().unwrap_or_default(),
            name = manifest.name().unwrap_or_default(),
            path = %path.display(),
            "Manifest applied"
        );
        Ok(ApplyResult {
            path: path.to_path_buf(),
            output,
        })
    }

    /// Apply a creation-only document and remove its file afterwards, on
    /// success and failure alike.
    pub async fn apply_transient(
        &self,
        manifest: &ResourceManifest,
        path: &Path,
    ) -> Result<ApplyResult> {
        let _cleanup = TransientFile {
            path: path.to_path_buf(),
        };
        self.apply(manifest, path).await
    }

    /// Run an imperative command with separately captured streams.
    pub async fn run(&self, command: ControlCommand) -> Result<ExecutionResult> {
        let started = Instant::now();
        let result = self.runner.run_action(&command).await;
        self.metrics.record_command(command.label(), started.elapsed());

        let output = result?;
        info!("Executed {}", command);
        Ok(ExecutionResult {
            command,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use command_runner::MockRunner;
    use command_runner_interface::CommandError;
    use serde_json::json;

    fn namespace() -> ResourceManifest {
        ResourceManifest::from_value(json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": "team-a" }
        }))
        .unwrap()
    }

    fn apply_failure() -> CommandError {
        CommandError::Failed {
            command: "kubectl apply".to_string(),
            exit_status: Some(1),
            stderr: "error: unable to recognize\n".to_string(),
        }
    }

    #[tokio::test]
    async fn test_apply_writes_then_invokes() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(MockRunner::new());
        let executor = ApplyExecutor::new(runner.clone());
        let path = dir.path().join("nested").join("team-a.yaml");

        executor.apply(&namespace(), &path).await.unwrap();

        assert!(path.exists());
        assert_eq!(runner.applied_paths(), vec![path.clone()]);
        assert_eq!(
            ResourceManifest::from_yaml(&runner.applied_documents()[0]).unwrap(),
            namespace()
        );
    }

    #[tokio::test]
    async fn test_apply_overwrites_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let executor = ApplyExecutor::new(Arc::new(MockRunner::new()));
        let path = dir.path().join("team-a.yaml");
        std::fs::write(&path, "stale: true\nand: a lot more content than the new document\n")
            .unwrap();

        executor.apply(&namespace(), &path).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(ResourceManifest::from_yaml(&content).unwrap(), namespace());
    }

    #[tokio::test]
    async fn test_transient_file_removed_on_success_and_failure() {
        let dir = tempfile::tempdir().unwrap();

        let ok_runner = Arc::new(MockRunner::new());
        let path = dir.path().join("ok.yaml");
        ApplyExecutor::new(ok_runner.clone())
            .apply_transient(&namespace(), &path)
            .await
            .unwrap();
        assert!(!path.exists());
        assert_eq!(ok_runner.apply_count(), 1);

        let failing = Arc::new(MockRunner::new().fail_apply(apply_failure()));
        let path = dir.path().join("fail.yaml");
        let err = ApplyExecutor::new(failing)
            .apply_transient(&namespace(), &path)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_apply_failure_keeps_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(MockRunner::new().fail_apply(apply_failure()));
        let err = ApplyExecutor::new(runner)
            .apply(&namespace(), &dir.path().join("x.yaml"))
            .await
            .unwrap_err();

        match err {
            CoreError::Execution {
                exit_status,
                stderr,
                ..
            } => {
                assert_eq!(exit_status, Some(1));
                assert_eq!(stderr, "error: unable to recognize\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_run_captures_output() {
        let runner = Arc::new(MockRunner::new().with_action_output("server_start", "starting\n"));
        let executor = ApplyExecutor::new(runner.clone());

        let result = executor
            .run(ControlCommand::ServerStart {
                server: "vm1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(result.stdout, "starting\n");
        assert_eq!(runner.mutating_actions().len(), 1);
    }
}

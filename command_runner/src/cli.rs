//! CLI-based command runner.
//!
//! Drives the control plane through the `kubectl` binary and the cloud
//! provider through the `openstack` binary.
//!
//! # Requirements
//!
//! - `kubectl` configured against the cluster running the reconciler
//! - `openstack` plus a credentials script (an `openrc`-style file that
//!   exports `OS_*` variables) readable by the service user
//!
//! Provider commands run as
//! `bash -c 'source "$1" && shift && exec "$@"' crossplane-facade <script> openstack ...`
//! so resource names travel as positional arguments and are never spliced
//! into shell text.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use command_runner_interface::{CommandError, CommandOutput, CommandRunner, ControlCommand};

const SOURCE_AND_EXEC: &str = r#"source "$1" && shift && exec "$@""#;

/// Configuration for CliCommandRunner.
#[derive(Debug, Clone)]
pub struct CliRunnerConfig {
    /// Path to kubectl binary (default: "kubectl")
    pub kubectl_binary: PathBuf,
    /// Path to openstack binary (default: "openstack")
    pub openstack_binary: PathBuf,
    /// Shell used to source the credentials script (default: "bash")
    pub shell: PathBuf,
    /// Credentials script sourced before every openstack call
    pub admin_script: PathBuf,
    /// Timeout for every command (default: 120s)
    pub command_timeout: Duration,
}

impl Default for CliRunnerConfig {
    fn default() -> Self {
        Self {
            kubectl_binary: PathBuf::from("kubectl"),
            openstack_binary: PathBuf::from("openstack"),
            shell: PathBuf::from("bash"),
            admin_script: PathBuf::from("/home/ubuntu/admin.sh"),
            command_timeout: Duration::from_secs(120),
        }
    }
}

/// A program and its arguments, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    fn display(&self) -> String {
        format!("{} {}", self.program.display(), self.args.join(" "))
    }
}

/// Runs control-plane and provider commands as child processes.
pub struct CliCommandRunner {
    config: CliRunnerConfig,
}

impl CliCommandRunner {
    pub fn new(config: CliRunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CliRunnerConfig {
        &self.config
    }

    fn kubectl<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation {
            program: self.config.kubectl_binary.clone(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn openstack<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = vec![
            "-c".to_string(),
            SOURCE_AND_EXEC.to_string(),
            "crossplane-facade".to_string(),
            self.config.admin_script.to_string_lossy().into_owned(),
            self.config.openstack_binary.to_string_lossy().into_owned(),
        ];
        argv.extend(args.into_iter().map(Into::into));
        Invocation {
            program: self.config.shell.clone(),
            args: argv,
        }
    }

    /// kubectl apply -f <path>
    pub fn apply_invocation(&self, path: &Path) -> Invocation {
        self.kubectl(["apply".to_string(), "-f".to_string(), path.to_string_lossy().into_owned()])
    }

    /// Map a control command onto a process invocation.
    pub fn invocation(&self, command: &ControlCommand) -> Invocation {
        match command {
            ControlCommand::ServerShow { server } => {
                self.openstack(["server", "show", server.as_str(), "-f", "json"])
            }
            ControlCommand::ServerStart { server } => {
                self.openstack(["server", "start", server.as_str()])
            }
            ControlCommand::ServerStop { server } => {
                self.openstack(["server", "stop", server.as_str()])
            }
            ControlCommand::DeleteResource {
                kind,
                name,
                namespace,
            } => self.kubectl([
                "delete",
                kind.resource_name(),
                name.as_str(),
                "--namespace",
                namespace.as_str(),
            ]),
            ControlCommand::ScaleDeployment {
                deployment,
                replicas,
                namespace,
            } => self.kubectl([
                "scale".to_string(),
                format!("deployment/{deployment}"),
                format!("--replicas={replicas}"),
                "-n".to_string(),
                namespace.clone(),
            ]),
            ControlCommand::GetNamespace { name } => {
                self.kubectl(["get", "namespace", name.as_str(), "-o", "json"])
            }
        }
    }

    /// Spawn an invocation and wait for it, bounded by the command timeout.
    async fn exec(&self, invocation: Invocation) -> Result<CommandOutput, CommandError> {
        let command = invocation.display();
        debug!("Executing: {}", command);
        let started = Instant::now();

        let output = tokio::time::timeout(
            self.config.command_timeout,
            Command::new(&invocation.program)
                .args(&invocation.args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            warn!("{} timed out after {:?}", command, self.config.command_timeout);
            CommandError::Timeout {
                command: command.clone(),
                timeout: self.config.command_timeout,
            }
        })?
        .map_err(|e| CommandError::Spawn {
            program: invocation.program.display().to_string(),
            message: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            warn!(
                "{} failed with {:?} after {:?}",
                command,
                output.status.code(),
                started.elapsed()
            );
            return Err(CommandError::Failed {
                command,
                exit_status: output.status.code(),
                stderr,
            });
        }

        debug!("{} finished in {:?}", command, started.elapsed());
        Ok(CommandOutput { stdout, stderr })
    }
}

#[async_trait]
impl CommandRunner for CliCommandRunner {
    async fn apply_manifest(&self, path: &Path) -> Result<CommandOutput, CommandError> {
        self.exec(self.apply_invocation(path)).await
    }

    async fn run_action(&self, command: &ControlCommand) -> Result<CommandOutput, CommandError> {
        self.exec(self.invocation(command)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_shared_types::ManifestKind;

    fn runner() -> CliCommandRunner {
        CliCommandRunner::new(CliRunnerConfig::default())
    }

    #[test]
    fn test_config_default() {
        let config = CliRunnerConfig::default();
        assert_eq!(config.kubectl_binary, PathBuf::from("kubectl"));
        assert_eq!(config.command_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_apply_invocation() {
        let inv = runner().apply_invocation(Path::new("/tmp/team-a-vm1.yaml"));
        assert_eq!(inv.program, PathBuf::from("kubectl"));
        assert_eq!(inv.args, vec!["apply", "-f", "/tmp/team-a-vm1.yaml"]);
    }

    #[test]
    fn test_server_show_passes_name_as_argument() {
        let inv = runner().invocation(&ControlCommand::ServerShow {
            server: "vm1".to_string(),
        });
        assert_eq!(inv.program, PathBuf::from("bash"));
        assert_eq!(inv.args[0], "-c");
        assert_eq!(inv.args[1], SOURCE_AND_EXEC);
        assert_eq!(
            &inv.args[3..],
            &["/home/ubuntu/admin.sh", "openstack", "server", "show", "vm1", "-f", "json"]
        );
    }

    #[test]
    fn test_delete_and_scale_invocations() {
        let runner = runner();
        let delete = runner.invocation(&ControlCommand::DeleteResource {
            kind: ManifestKind::InstanceV2,
            name: "vm1".to_string(),
            namespace: "team-a".to_string(),
        });
        assert_eq!(delete.args, vec!["delete", "instancev2", "vm1", "--namespace", "team-a"]);

        let scale = runner.invocation(&ControlCommand::ScaleDeployment {
            deployment: "web".to_string(),
            replicas: 3,
            namespace: "team-a".to_string(),
        });
        assert_eq!(scale.args, vec!["scale", "deployment/web", "--replicas=3", "-n", "team-a"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exec_captures_streams_separately() {
        let runner = runner();
        let output = runner
            .exec(Invocation {
                program: PathBuf::from("sh"),
                args: vec!["-c".to_string(), "echo out; echo err >&2".to_string()],
            })
            .await
            .unwrap();
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exec_nonzero_exit_preserves_stderr() {
        let runner = runner();
        let err = runner
            .exec(Invocation {
                program: PathBuf::from("sh"),
                args: vec!["-c".to_string(), "echo 'boom: no such vm' >&2; exit 3".to_string()],
            })
            .await
            .unwrap_err();
        assert_eq!(err.exit_status(), Some(3));
        assert_eq!(err.stderr(), "boom: no such vm\n");
    }

    #[tokio::test]
    async fn test_exec_missing_binary() {
        let runner = runner();
        let err = runner
            .exec(Invocation {
                program: PathBuf::from("/nonexistent/kubectl-binary"),
                args: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exec_times_out() {
        let runner = CliCommandRunner::new(CliRunnerConfig {
            command_timeout: Duration::from_millis(100),
            ..CliRunnerConfig::default()
        });
        let err = runner
            .exec(Invocation {
                program: PathBuf::from("sleep"),
                args: vec!["5".to_string()],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
    }
}

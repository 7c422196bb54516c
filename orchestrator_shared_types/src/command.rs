//! Imperative control commands.

use std::fmt;
use std::str::FromStr;

use crate::manifest::ManifestKind;

/// Field of the `ServerShow` document carrying the operation in progress on
/// a server; null or empty when the server is idle.
pub const TASK_STATE_FIELD: &str = "OS-EXT-STS:task_state";

/// A one-shot command against the control plane or the cloud provider.
///
/// Runners decide how each variant maps onto a process; the orchestrator only
/// picks which one to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Live status of a compute server, as a JSON document.
    ServerShow { server: String },
    ServerStart { server: String },
    ServerStop { server: String },
    /// Delete a control-plane resource by name.
    DeleteResource {
        kind: ManifestKind,
        name: String,
        namespace: String,
    },
    /// Set the replica count of a deployment.
    ScaleDeployment {
        deployment: String,
        replicas: u32,
        namespace: String,
    },
    /// Describe a tenant namespace, as a JSON document.
    GetNamespace { name: String },
}

impl ControlCommand {
    /// Short, low-cardinality label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ControlCommand::ServerShow { .. } => "server_show",
            ControlCommand::ServerStart { .. } => "server_start",
            ControlCommand::ServerStop { .. } => "server_stop",
            ControlCommand::DeleteResource { .. } => "delete",
            ControlCommand::ScaleDeployment { .. } => "scale",
            ControlCommand::GetNamespace { .. } => "get_namespace",
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlCommand::ServerShow { server } => write!(f, "server show {server}"),
            ControlCommand::ServerStart { server } => write!(f, "server start {server}"),
            ControlCommand::ServerStop { server } => write!(f, "server stop {server}"),
            ControlCommand::DeleteResource {
                kind,
                name,
                namespace,
            } => write!(f, "delete {} {name} -n {namespace}", kind.resource_name()),
            ControlCommand::ScaleDeployment {
                deployment,
                replicas,
                namespace,
            } => write!(f, "scale deployment/{deployment} --replicas={replicas} -n {namespace}"),
            ControlCommand::GetNamespace { name } => write!(f, "get namespace {name}"),
        }
    }
}

/// State-changing actions on a live VM, addressed through the action route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VmAction {
    Start,
    Stop,
    Delete,
}

impl VmAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            VmAction::Start => "start",
            VmAction::Stop => "stop",
            VmAction::Delete => "delete",
        }
    }
}

impl fmt::Display for VmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported action '{0}'.")]
pub struct UnsupportedAction(pub String);

impl FromStr for VmAction {
    type Err = UnsupportedAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(VmAction::Start),
            "stop" => Ok(VmAction::Stop),
            "delete" => Ok(VmAction::Delete),
            other => Err(UnsupportedAction(other.to_string())),
        }
    }
}

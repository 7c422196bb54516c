//! Action Orchestrator.
//!
//! Sequences every tenant request:
//!
//! ```text
//! Idle ──▶ Inspecting ──▶ Blocked
//!   │           │
//!   │           ▼
//!   └──────▶ Proceeding ──▶ Executing ──▶ Completed | Failed
//! ```
//!
//! Only actions on a live server's execution state (start, stop and the
//! action-route delete) pass through `Inspecting`. Manifest operations go
//! straight to `Proceeding`.
//!
//! The busy check is read-then-act. Unless `serialize_per_resource` is set,
//! two concurrent actions on one server can both pass it before either lands.
//!
//! "Applied" means accepted by the reconciler, not converged.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};
use uuid::Uuid;

use command_runner_interface::{CommandRunner, ControlCommand};
use facade_config::FacadeConfig;
use observability::{ActionOutcome, FacadeMetrics};
use orchestrator_shared_types::{
    validate_name, AttachDiskRequest, CreateBlockVolumeRequest, CreateVmRequest, FieldPath,
    ManifestKind, RegisterTeamRequest, ResizeVmRequest, ResourceManifest, ResourceRef, ScaleRequest,
    VmAction,
};

use crate::builder::{attachment_name, ManifestBuilder, ManifestParams};
use crate::error::{CoreError, ErrorKind, Result};
use crate::executor::ApplyExecutor;
use crate::inspector::StateInspector;
use crate::locks::ResourceLocks;
use crate::store::ManifestStore;

/// Field rewritten by a resize.
pub const FLAVOR_FIELD: &str = "spec.forProvider.flavorId";

/// Phases of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    Idle,
    Inspecting,
    Blocked,
    Proceeding,
    Executing,
    Completed,
    Failed,
}

impl fmt::Display for ActionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a completed request reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub message: String,
    /// Raw output of the external command, when the caller should see it.
    pub output: Option<String>,
}

impl ActionReport {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            output: None,
        }
    }
}

/// Construction-time settings.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorSettings {
    pub config: FacadeConfig,
}

impl From<&FacadeConfig> for OrchestratorSettings {
    fn from(config: &FacadeConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

/// Tracks the phase of one request for logging and metrics.
struct Transition {
    action: &'static str,
    target: String,
    phase: ActionPhase,
}

impl Transition {
    fn start(action: &'static str, target: impl Into<String>) -> Self {
        Self {
            action,
            target: target.into(),
            phase: ActionPhase::Idle,
        }
    }

    fn advance(&mut self, next: ActionPhase) {
        debug!(
            action = self.action,
            target = %self.target,
            "{} -> {}",
            self.phase,
            next
        );
        self.phase = next;
    }
}

pub struct ActionOrchestrator {
    builder: ManifestBuilder,
    store: ManifestStore,
    inspector: StateInspector,
    executor: ApplyExecutor,
    locks: Option<ResourceLocks>,
    metrics: FacadeMetrics,
}

impl ActionOrchestrator {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: OrchestratorSettings) -> Self {
        let config = settings.config;
        let locks = config
            .orchestration
            .serialize_per_resource
            .then(ResourceLocks::new);

        Self {
            builder: ManifestBuilder::new(config.provider.clone()),
            store: ManifestStore::new(&config.paths.manifest_dir, &config.paths.scratch_dir),
            inspector: StateInspector::new(runner.clone()),
            executor: ApplyExecutor::new(runner),
            locks,
            metrics: FacadeMetrics,
        }
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// Register a tenant by applying its namespace.
    pub async fn register_tenant(&self, request: &RegisterTeamRequest) -> Result<ActionReport> {
        let mut t = Transition::start("register_team", &request.name);
        let result: Result<ActionReport> = async {
            if request.name.trim().is_empty() {
                return Err(CoreError::validation("Missing 'name' in request"));
            }
            t.advance(ActionPhase::Proceeding);
            let manifest = self.builder.build(&request.name, ManifestParams::Namespace)?;
            let path = self
                .store
                .scratch_path(&format!("namespace-{}-{}.yaml", request.name, short_id()));

            t.advance(ActionPhase::Executing);
            self.executor
                .apply_transient(&manifest, &path)
                .await
                .map_err(|e| e.annotate("create namespace", &request.name))?;

            Ok(ActionReport::new(format!(
                "Namespace '{}' created successfully.",
                request.name
            )))
        }
        .await;
        self.finish(t, result)
    }

    /// Live namespace status, passed through unmodified.
    pub async fn describe_tenant(&self, tenant: &str) -> Result<Value> {
        validate_name("team", tenant)?;
        self.inspector.namespace_status(tenant).await
    }

    /// Create a VM and persist its manifest for later updates.
    pub async fn create_vm(&self, tenant: &str, request: &CreateVmRequest) -> Result<ActionReport> {
        let mut t = Transition::start("create_vm", &request.name);
        let result: Result<ActionReport> = async {
            t.advance(ActionPhase::Proceeding);
            let manifest = self.builder.build(tenant, ManifestParams::Instance(request))?;
            let reference = ResourceRef::new(tenant, &request.name);
            let _guard = self.lock(&reference).await;

            t.advance(ActionPhase::Executing);
            self.executor
                .apply(&manifest, &self.store.path_for(&reference))
                .await
                .map_err(|e| e.annotate("provision VM", &request.name))?;

            Ok(ActionReport::new(format!(
                "VM '{}' provisioned successfully in namespace '{}'.",
                request.name, tenant
            )))
        }
        .await;
        self.finish(t, result)
    }

    /// Change the flavor of an existing VM by re-applying its stored manifest.
    pub async fn resize_vm(
        &self,
        tenant: &str,
        vm: &str,
        request: &ResizeVmRequest,
    ) -> Result<ActionReport> {
        let mut t = Transition::start("resize_vm", vm);
        let result: Result<ActionReport> = async {
            if request.flavor_id.trim().is_empty() {
                return Err(CoreError::validation("Missing 'flavorId' in request"));
            }
            validate_name("team", tenant)?;
            validate_name("vm", vm)?;

            t.advance(ActionPhase::Proceeding);
            let reference = ResourceRef::new(tenant, vm);
            let _guard = self.lock(&reference).await;

            let current = self.store.load(&reference).await?;
            check_identity(&current, &reference)?;
            let flavor = request.flavor_id.clone();
            let updated = self.store.update(&current, &FieldPath::parse(FLAVOR_FIELD), |slot| {
                *slot = Value::String(flavor)
            })?;

            t.advance(ActionPhase::Executing);
            self.executor
                .apply(&updated, &self.store.path_for(&reference))
                .await
                .map_err(|e| e.annotate("update VM flavor", vm))?;

            Ok(ActionReport::new(format!(
                "Flavor for VM '{vm}' updated successfully."
            )))
        }
        .await;
        self.finish(t, result)
    }

    /// Scale through the external scaling primitive. No manifest is involved.
    pub async fn scale(
        &self,
        tenant: &str,
        resource: &str,
        request: &ScaleRequest,
    ) -> Result<ActionReport> {
        let mut t = Transition::start("scale", resource);
        let result: Result<ActionReport> = async {
            let replicas = match request.replicas {
                None => return Err(CoreError::validation("Missing 'replicas' in request")),
                Some(n) => u32::try_from(n).map_err(|_| {
                    CoreError::validation(format!("'replicas' must be between 0 and {}", u32::MAX))
                })?,
            };
            validate_name("team", tenant)?;
            validate_name("resource", resource)?;

            t.advance(ActionPhase::Proceeding);
            let command = ControlCommand::ScaleDeployment {
                deployment: resource.to_string(),
                replicas,
                namespace: tenant.to_string(),
            };

            t.advance(ActionPhase::Executing);
            self.executor
                .run(command)
                .await
                .map_err(|e| e.annotate("scale VM", resource))?;

            Ok(ActionReport::new(format!(
                "Scaled VM '{resource}' to {replicas} replicas."
            )))
        }
        .await;
        self.finish(t, result)
    }

    /// Request a volume attachment. The attachment gets a fresh name each time.
    pub async fn attach_disk(
        &self,
        tenant: &str,
        vm: &str,
        request: &AttachDiskRequest,
    ) -> Result<ActionReport> {
        let mut t = Transition::start("attach_disk", vm);
        let result: Result<ActionReport> = async {
            t.advance(ActionPhase::Proceeding);
            let suffix = short_id();
            let manifest = self.builder.build(
                tenant,
                ManifestParams::VolumeAttachment {
                    vm_name: vm,
                    request,
                    suffix: &suffix,
                },
            )?;
            let name = attachment_name(vm, &suffix);
            let path = self.store.scratch_path(&format!("{name}.yaml"));

            t.advance(ActionPhase::Executing);
            self.executor
                .apply_transient(&manifest, &path)
                .await
                .map_err(|e| e.annotate("attach disk", vm))?;

            Ok(ActionReport::new(format!(
                "Disk attachment request sent: {name}"
            )))
        }
        .await;
        self.finish(t, result)
    }

    /// Create a block volume; the raw apply output is reported back.
    pub async fn create_block_volume(
        &self,
        tenant: &str,
        request: &CreateBlockVolumeRequest,
    ) -> Result<ActionReport> {
        let mut t = Transition::start("create_block_volume", &request.name);
        let result: Result<ActionReport> = async {
            t.advance(ActionPhase::Proceeding);
            let manifest = self
                .builder
                .build(tenant, ManifestParams::BlockVolume(request))?;
            let path = self
                .store
                .scratch_path(&format!("{}-block-{}.yaml", request.name, short_id()));

            t.advance(ActionPhase::Executing);
            let applied = self
                .executor
                .apply_transient(&manifest, &path)
                .await
                .map_err(|e| e.annotate("apply block volume manifest", &request.name))?;

            Ok(ActionReport {
                message: format!(
                    "Block volume '{}' created successfully in namespace '{}'.",
                    request.name, tenant
                ),
                output: Some(applied.output.stdout),
            })
        }
        .await;
        self.finish(t, result)
    }

    /// Start, stop or delete a VM, refusing while it is mid-transition.
    ///
    /// This is the preferred delete primitive: it checks the busy state first.
    pub async fn vm_action(&self, tenant: &str, vm: &str, action: VmAction) -> Result<ActionReport> {
        let mut t = Transition::start(action_label(action), vm);
        let result: Result<ActionReport> = async {
            validate_name("team", tenant)?;
            validate_name("vm", vm)?;

            let reference = ResourceRef::new(tenant, vm);
            let _guard = self.lock(&reference).await;

            t.advance(ActionPhase::Inspecting);
            let status = self.inspector.current_state(vm).await?;
            if let Some(task_state) = status.task_state {
                t.advance(ActionPhase::Blocked);
                return Err(CoreError::Conflict {
                    resource: vm.to_string(),
                    task_state,
                });
            }
            t.advance(ActionPhase::Proceeding);

            let command = match action {
                VmAction::Start => ControlCommand::ServerStart {
                    server: vm.to_string(),
                },
                VmAction::Stop => ControlCommand::ServerStop {
                    server: vm.to_string(),
                },
                VmAction::Delete => ControlCommand::DeleteResource {
                    kind: ManifestKind::InstanceV2,
                    name: vm.to_string(),
                    namespace: tenant.to_string(),
                },
            };

            t.advance(ActionPhase::Executing);
            let executed = self
                .executor
                .run(command)
                .await
                .map_err(|e| e.annotate(format!("execute action '{action}' on VM"), vm))?;

            Ok(ActionReport {
                message: format!(
                    "Action '{action}' executed on VM '{vm}'. Output:\n{}",
                    executed.stdout
                ),
                output: Some(executed.stdout),
            })
        }
        .await;
        self.finish(t, result)
    }

    /// Delete a VM resource by name without the busy check.
    pub async fn delete_vm(&self, tenant: &str, vm: &str) -> Result<ActionReport> {
        let mut t = Transition::start("delete_vm", vm);
        let result: Result<ActionReport> = async {
            validate_name("team", tenant)?;
            validate_name("vm", vm)?;

            t.advance(ActionPhase::Proceeding);
            let command = ControlCommand::DeleteResource {
                kind: ManifestKind::InstanceV2,
                name: vm.to_string(),
                namespace: tenant.to_string(),
            };

            t.advance(ActionPhase::Executing);
            self.executor
                .run(command)
                .await
                .map_err(|e| e.annotate("delete VM", vm))?;

            Ok(ActionReport::new(format!(
                "VM '{vm}' deleted from team '{tenant}'."
            )))
        }
        .await;
        self.finish(t, result)
    }

    async fn lock(&self, reference: &ResourceRef) -> Option<OwnedMutexGuard<()>> {
        match &self.locks {
            Some(locks) => Some(locks.acquire(reference).await),
            None => None,
        }
    }

    /// Close out a request: final phase, log line, metric.
    fn finish(&self, mut t: Transition, result: Result<ActionReport>) -> Result<ActionReport> {
        let outcome = match &result {
            Ok(_) => {
                t.advance(ActionPhase::Completed);
                ActionOutcome::Completed
            }
            Err(e) => match e.kind() {
                ErrorKind::Conflict => ActionOutcome::Blocked,
                ErrorKind::Validation | ErrorKind::NotFound => ActionOutcome::Rejected,
                _ => {
                    t.advance(ActionPhase::Failed);
                    ActionOutcome::Failed
                }
            },
        };

        match &result {
            Ok(_) => info!(action = t.action, target = %t.target, "Action completed"),
            Err(e) => warn!(
                action = t.action,
                target = %t.target,
                outcome = outcome.as_str(),
                "Action did not complete: {}",
                e
            ),
        }
        self.metrics.record_action(t.action, outcome);
        result
    }
}

fn action_label(action: VmAction) -> &'static str {
    match action {
        VmAction::Start => "start_vm",
        VmAction::Stop => "stop_vm",
        VmAction::Delete => "delete_vm_checked",
    }
}

/// Eight hex characters, for transient file and attachment names.
fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// A stored manifest must describe the resource it is filed under.
fn check_identity(manifest: &ResourceManifest, reference: &ResourceRef) -> Result<()> {
    let identity = manifest
        .identity()
        .map_err(|source| CoreError::MalformedManifest {
            manifest: reference.to_string(),
            source,
        })?;

    let matches = identity.name == reference.name
        && identity.namespace.as_deref() == Some(reference.tenant.as_str());
    if !matches {
        return Err(CoreError::validation(format!(
            "stored manifest for {} describes {}/{}",
            reference,
            identity.namespace.unwrap_or_default(),
            identity.name
        )));
    }
    Ok(())
}

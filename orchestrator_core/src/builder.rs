//! Manifest Builder.
//!
//! Pure: turns validated request parameters plus the tenant into a
//! [`ResourceManifest`]. The same inputs always produce structurally equal
//! output, which is what makes re-apply idempotent.

use serde_json::json;

use facade_config::ProviderConfig;
use orchestrator_shared_types::{
    validate_name, AttachDiskRequest, CreateBlockVolumeRequest, CreateVmRequest, ManifestKind,
    ResourceManifest, MAX_NAME_LEN,
};

use crate::error::{CoreError, Result};

/// Security group applied when a request names none.
pub const DEFAULT_SECURITY_GROUP: &str = "default";

/// Parameters for one manifest, by kind.
#[derive(Debug, Clone, Copy)]
pub enum ManifestParams<'a> {
    /// The tenant's own isolation boundary.
    Namespace,
    Instance(&'a CreateVmRequest),
    BlockVolume(&'a CreateBlockVolumeRequest),
    VolumeAttachment {
        vm_name: &'a str,
        request: &'a AttachDiskRequest,
        /// Uniquifying suffix, supplied by the caller to keep this pure.
        suffix: &'a str,
    },
}

impl ManifestParams<'_> {
    pub fn kind(&self) -> ManifestKind {
        match self {
            ManifestParams::Namespace => ManifestKind::Namespace,
            ManifestParams::Instance(_) => ManifestKind::InstanceV2,
            ManifestParams::BlockVolume(_) => ManifestKind::VolumeV3,
            ManifestParams::VolumeAttachment { .. } => ManifestKind::VolumeAttachmentV2,
        }
    }
}

/// Builds manifests stamped with the configured provider settings.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    provider: ProviderConfig,
}

impl ManifestBuilder {
    pub fn new(provider: ProviderConfig) -> Self {
        Self { provider }
    }

    /// Build the manifest for `params` inside `tenant`.
    pub fn build(&self, tenant: &str, params: ManifestParams<'_>) -> Result<ResourceManifest> {
        validate_name("team", tenant)?;

        let value = match params {
            ManifestParams::Namespace => json!({
                "apiVersion": "v1",
                "kind": ManifestKind::Namespace.as_str(),
                "metadata": { "name": tenant },
            }),
            ManifestParams::Instance(req) => self.instance(tenant, req)?,
            ManifestParams::BlockVolume(req) => self.block_volume(tenant, req)?,
            ManifestParams::VolumeAttachment {
                vm_name,
                request,
                suffix,
            } => self.volume_attachment(tenant, vm_name, request, suffix)?,
        };

        // Every branch above emits the identifying fields.
        ResourceManifest::from_value(value)
            .map_err(|e| CoreError::validation(format!("invalid manifest: {e}")))
    }

    fn instance(&self, tenant: &str, req: &CreateVmRequest) -> Result<serde_json::Value> {
        require(&[
            ("name", req.name.as_str()),
            ("imageId", req.image_id.as_str()),
            ("flavorId", req.flavor_id.as_str()),
            ("networkId", req.network_id.as_str()),
        ])?;
        validate_name("name", &req.name)?;

        let security_groups = match &req.security_groups {
            Some(groups) if !groups.is_empty() => groups.clone(),
            _ => vec![DEFAULT_SECURITY_GROUP.to_string()],
        };

        Ok(json!({
            "apiVersion": self.provider.instance_api_version,
            "kind": ManifestKind::InstanceV2.as_str(),
            "metadata": { "name": req.name, "namespace": tenant },
            "spec": {
                "forProvider": {
                    "configDrive": true,
                    "flavorId": req.flavor_id,
                    "imageId": req.image_id,
                    "name": req.name,
                    "network": [{ "uuid": req.network_id }],
                    "securityGroups": security_groups,
                },
                "providerConfigRef": { "name": self.provider.config_ref },
            },
        }))
    }

    fn block_volume(&self, tenant: &str, req: &CreateBlockVolumeRequest) -> Result<serde_json::Value> {
        let size = req.size.to_string();
        let size_field = if req.size == 0 { "" } else { size.as_str() };
        require(&[("name", req.name.as_str()), ("size", size_field)])?;
        validate_name("name", &req.name)?;

        Ok(json!({
            "apiVersion": self.provider.volume_api_version,
            "kind": ManifestKind::VolumeV3.as_str(),
            "metadata": { "name": req.name, "namespace": tenant },
            "spec": {
                "forProvider": {
                    "name": req.name,
                    "size": req.size,
                    "description": req.description.as_deref().unwrap_or_default(),
                },
                "providerConfigRef": { "name": self.provider.config_ref },
            },
        }))
    }

    fn volume_attachment(
        &self,
        tenant: &str,
        vm_name: &str,
        req: &AttachDiskRequest,
        suffix: &str,
    ) -> Result<serde_json::Value> {
        require(&[
            ("volumeId", req.volume_id.as_str()),
            ("instanceId", req.instance_id.as_str()),
        ])?;
        validate_name("vm", vm_name)?;

        let name = attachment_name(vm_name, suffix);
        validate_name("attachment name", &name)?;

        Ok(json!({
            "apiVersion": self.provider.instance_api_version,
            "kind": ManifestKind::VolumeAttachmentV2.as_str(),
            "metadata": { "name": name, "namespace": tenant },
            "spec": {
                "instanceId": req.instance_id,
                "volumeId": req.volume_id,
                "providerConfigRef": { "name": self.provider.config_ref },
                "deletionPolicy": "Delete",
            },
        }))
    }
}

/// `<vm>-attach-<suffix>`, with the VM part shortened to fit the name limit.
pub fn attachment_name(vm_name: &str, suffix: &str) -> String {
    let tail = format!("-attach-{suffix}");
    let room = MAX_NAME_LEN.saturating_sub(tail.len());
    // Names are ASCII, so any byte offset is a char boundary.
    let head = vm_name
        .get(..room.min(vm_name.len()))
        .unwrap_or(vm_name)
        .trim_end_matches(|c: char| !c.is_ascii_alphanumeric());
    format!("{head}{tail}")
}

/// Fail naming every field that is empty.
fn require(fields: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

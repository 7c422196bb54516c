//! Declarative resource manifests.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Errors raised while reading or mutating a manifest document.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest is not a mapping")]
    NotAMapping,

    #[error("manifest field '{0}' is missing or not a string")]
    MissingField(&'static str),

    #[error("path '{path}' does not resolve: '{segment}' is missing or not a mapping")]
    UnresolvedPath { path: String, segment: String },

    #[error("empty field path")]
    EmptyPath,

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Resource kinds the facade knows how to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManifestKind {
    Namespace,
    InstanceV2,
    VolumeV3,
    VolumeAttachmentV2,
}

impl ManifestKind {
    /// The `kind` field value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestKind::Namespace => "Namespace",
            ManifestKind::InstanceV2 => "InstanceV2",
            ManifestKind::VolumeV3 => "VolumeV3",
            ManifestKind::VolumeAttachmentV2 => "VolumeAttachmentV2",
        }
    }

    /// Resource name as accepted by `kubectl get/delete`.
    pub fn resource_name(&self) -> &'static str {
        match self {
            ManifestKind::Namespace => "namespace",
            ManifestKind::InstanceV2 => "instancev2",
            ManifestKind::VolumeV3 => "volumev3",
            ManifestKind::VolumeAttachmentV2 => "volumeattachmentv2",
        }
    }

    pub fn is_namespaced(&self) -> bool {
        !matches!(self, ManifestKind::Namespace)
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addresses an existing manifest by tenant and resource name.
///
/// Holding a reference says nothing about whether the manifest exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub tenant: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(tenant: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            name: name.into(),
        }
    }

    /// Location of the applied manifest relative to the manifest directory:
    /// `<tenant>/<name>.yaml`. Names never contain `/`, so distinct
    /// references never share a file.
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.tenant).join(format!("{}.yaml", self.name))
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant, self.name)
    }
}

/// `(kind, namespace, name)`, unique within a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestIdentity {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

/// Dotted path into a manifest document, e.g. `spec.forProvider.flavorId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// A declarative resource document: `apiVersion`, `kind`, `metadata`, `spec`.
///
/// Nested content is kept as an untyped value tree. Equality is structural,
/// so key order never matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceManifest(Value);

impl ResourceManifest {
    /// Wrap a value, checking that it carries the identifying fields.
    pub fn from_value(value: Value) -> crate::Result<Self> {
        let manifest = Self(value);
        if !manifest.0.is_object() {
            return Err(ManifestError::NotAMapping);
        }
        manifest.api_version()?;
        manifest.kind()?;
        manifest.name()?;
        Ok(manifest)
    }

    /// Parse a YAML document previously written by [`ResourceManifest::to_yaml`].
    pub fn from_yaml(content: &str) -> crate::Result<Self> {
        let value: Value = serde_yaml::from_str(content)?;
        Self::from_value(value)
    }

    pub fn to_yaml(&self) -> crate::Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    pub fn api_version(&self) -> crate::Result<&str> {
        self.0
            .get("apiVersion")
            .and_then(Value::as_str)
            .ok_or(ManifestError::MissingField("apiVersion"))
    }

    pub fn kind(&self) -> crate::Result<&str> {
        self.0
            .get("kind")
            .and_then(Value::as_str)
            .ok_or(ManifestError::MissingField("kind"))
    }

    pub fn name(&self) -> crate::Result<&str> {
        self.0
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .ok_or(ManifestError::MissingField("metadata.name"))
    }

    pub fn namespace(&self) -> Option<&str> {
        self.0.pointer("/metadata/namespace").and_then(Value::as_str)
    }

    pub fn identity(&self) -> crate::Result<ManifestIdentity> {
        Ok(ManifestIdentity {
            kind: self.kind()?.to_string(),
            namespace: self.namespace().map(str::to_string),
            name: self.name()?.to_string(),
        })
    }

    /// Read a nested field, if every segment resolves.
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        path.segments()
            .iter()
            .try_fold(&self.0, |node, segment| node.get(segment.as_str()))
    }

    /// Mutable slot for a nested field.
    ///
    /// Every segment but the last must already exist as a mapping. The last
    /// segment is inserted as `null` when absent.
    pub fn slot_mut(&mut self, path: &FieldPath) -> crate::Result<&mut Value> {
        let (leaf, parents) = path.segments().split_last().ok_or(ManifestError::EmptyPath)?;

        let mut node: &mut Map<String, Value> =
            self.0.as_object_mut().ok_or(ManifestError::NotAMapping)?;
        for segment in parents {
            node = node
                .get_mut(segment.as_str())
                .and_then(Value::as_object_mut)
                .ok_or_else(|| ManifestError::UnresolvedPath {
                    path: path.to_string(),
                    segment: segment.clone(),
                })?;
        }

        Ok(node.entry(leaf.clone()).or_insert(Value::Null))
    }

    /// Set a nested field. Fails if the parent structure is absent.
    pub fn set(&mut self, path: &FieldPath, value: Value) -> crate::Result<()> {
        *self.slot_mut(path)? = value;
        Ok(())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn instance() -> ResourceManifest {
        ResourceManifest::from_value(json!({
            "apiVersion": "compute.openstack.crossplane.io/v1alpha1",
            "kind": "InstanceV2",
            "metadata": { "name": "vm1", "namespace": "team-a" },
            "spec": {
                "forProvider": { "flavorId": "f1", "imageId": "img1" },
                "providerConfigRef": { "name": "provider-openstack-config" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_identity() {
        let identity = instance().identity().unwrap();
        assert_eq!(identity.kind, "InstanceV2");
        assert_eq!(identity.namespace.as_deref(), Some("team-a"));
        assert_eq!(identity.name, "vm1");
    }

    #[test]
    fn test_from_value_requires_metadata_name() {
        let err = ResourceManifest::from_value(json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": {}
        }))
        .unwrap_err();
        assert!(matches!(err, ManifestError::MissingField("metadata.name")));
    }

    #[test]
    fn test_set_nested_field() {
        let mut manifest = instance();
        let path = FieldPath::parse("spec.forProvider.flavorId");
        manifest.set(&path, json!("f2")).unwrap();
        assert_eq!(manifest.get(&path), Some(&json!("f2")));
    }

    #[test]
    fn test_set_fails_when_parent_missing() {
        let mut manifest = ResourceManifest::from_value(json!({
            "apiVersion": "v1",
            "kind": "InstanceV2",
            "metadata": { "name": "vm1" },
            "spec": { "forProvider": "not-a-map" }
        }))
        .unwrap();

        let err = manifest
            .set(&FieldPath::parse("spec.forProvider.flavorId"), json!("f2"))
            .unwrap_err();
        match err {
            ManifestError::UnresolvedPath { segment, .. } => assert_eq!(segment, "forProvider"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_yaml_preserves_structure() {
        let manifest = instance();
        let yaml = manifest.to_yaml().unwrap();
        assert!(yaml.contains("kind: InstanceV2"));
        assert_eq!(ResourceManifest::from_yaml(&yaml).unwrap(), manifest);
    }

    #[test]
    fn test_resource_ref_paths_do_not_collide() {
        let first = ResourceRef::new("a-b", "c");
        let second = ResourceRef::new("a", "b-c");
        assert_eq!(first.relative_path(), PathBuf::from("a-b/c.yaml"));
        assert_eq!(second.relative_path(), PathBuf::from("a/b-c.yaml"));
        assert_ne!(first.relative_path(), second.relative_path());
    }
}

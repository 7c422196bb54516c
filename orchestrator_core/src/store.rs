//! Manifest Store Accessor.
//!
//! Applied manifests live at `<manifest_dir>/<tenant>/<name>.yaml`. This
//! module reads them back and mutates in-memory copies; it never writes.
//! Writing belongs to the apply path, so a file only changes when it is
//! applied.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use orchestrator_shared_types::{FieldPath, ResourceManifest, ResourceRef};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct ManifestStore {
    manifest_dir: PathBuf,
    scratch_dir: PathBuf,
}

impl ManifestStore {
    pub fn new(manifest_dir: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest_dir: manifest_dir.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn manifest_dir(&self) -> &Path {
        &self.manifest_dir
    }

    /// Deterministic location of the applied manifest for a reference.
    pub fn path_for(&self, reference: &ResourceRef) -> PathBuf {
        self.manifest_dir.join(reference.relative_path())
    }

    /// Location for a transient creation document.
    pub fn scratch_path(&self, file_name: &str) -> PathBuf {
        self.scratch_dir.join(file_name)
    }

    /// Read the applied manifest for `reference`.
    pub async fn load(&self, reference: &ResourceRef) -> Result<ResourceManifest> {
        let path = self.path_for(reference);
        debug!("Loading manifest for {} from {}", reference, path.display());

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                return Err(CoreError::NotFound(format!("{} not found", path.display())));
            }
            Err(e) => return Err(CoreError::io(path, e)),
        };

        ResourceManifest::from_yaml(&content)
            .map_err(|source| CoreError::MalformedManifest {
                manifest: path.display().to_string(),
                source,
            })
    }

    /// Apply `mutate` to the field at `field` on a copy of `manifest`.
    ///
    /// The parents of the field must exist as mappings; the field itself is
    /// created as `null` before `mutate` runs if it is absent. The original
    /// is left untouched and nothing is written.
    pub fn update<F>(
        &self,
        manifest: &ResourceManifest,
        field: &FieldPath,
        mutate: F,
    ) -> Result<ResourceManifest>
    where
        F: FnOnce(&mut Value),
    {
        let mut updated = manifest.clone();
        let slot = updated
            .slot_mut(field)
            .map_err(|source| CoreError::MalformedManifest {
                manifest: manifest.name().unwrap_or("<unnamed>").to_string(),
                source,
            })?;
        mutate(slot);
        Ok(updated)
    }
}

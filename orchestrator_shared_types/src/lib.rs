//! Types shared across the crossplane facade.
//!
//! The manifest is modelled as a loosely-typed document (`serde_json::Value`)
//! wrapped in [`ResourceManifest`], so stored manifests can be mutated by
//! path without a fixed schema. Request bodies, imperative control commands
//! and name validation live here too, since both the API server and the CLI
//! client speak them.

pub mod command;
pub mod manifest;
pub mod names;
pub mod requests;

pub use command::{ControlCommand, UnsupportedAction, VmAction, TASK_STATE_FIELD};
pub use manifest::{
    FieldPath, ManifestError, ManifestIdentity, ManifestKind, ResourceManifest, ResourceRef,
};
pub use names::{validate_name, NameError, MAX_NAME_LEN};
pub use requests::{
    AttachDiskRequest, CreateBlockVolumeRequest, CreateVmRequest, MessageResponse,
    RegisterTeamRequest, ResizeVmRequest, ScaleRequest,
};

/// Type alias for Result with ManifestError.
pub type Result<T> = std::result::Result<T, ManifestError>;

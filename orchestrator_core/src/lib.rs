//! Orchestration of tenant requests against the declarative control plane.
//!
//! Requests are turned into manifests (`builder`), persisted and re-read
//! (`store`), checked against live provider state (`inspector`) and carried
//! out through a command runner (`executor`). `orchestrator` sequences the
//! whole thing.

pub mod builder;
pub mod error;
pub mod executor;
pub mod inspector;
pub mod locks;
pub mod orchestrator;
pub mod store;

pub use builder::{ManifestBuilder, ManifestParams};
pub use error::{CoreError, ErrorKind, Result};
pub use executor::{ApplyExecutor, ApplyResult, ExecutionResult};
pub use inspector::{LiveStatus, StateInspector, TASK_STATE_FIELD};
pub use locks::ResourceLocks;
pub use orchestrator::{ActionOrchestrator, ActionPhase, ActionReport, OrchestratorSettings};
pub use store::ManifestStore;

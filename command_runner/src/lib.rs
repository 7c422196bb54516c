//! Command Runner implementations for the orchestrator.
//!
//! This crate provides implementations of the `CommandRunner` trait:
//! - `CliCommandRunner`: runs `kubectl` and `openstack` as child processes
//! - `MockRunner`: in-memory recording double for testing (default feature)

pub mod cli;

#[cfg(feature = "mock-runner")]
pub mod mock;

// Re-export common types
pub use command_runner_interface::{CommandError, CommandOutput, CommandRunner, ControlCommand};

pub use cli::{CliCommandRunner, CliRunnerConfig};

#[cfg(feature = "mock-runner")]
pub use mock::MockRunner;

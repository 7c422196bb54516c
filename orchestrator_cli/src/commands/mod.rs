//! Subcommand implementations.

pub mod block;
pub mod team;
pub mod vm;

use orchestrator_shared_types::MessageResponse;

use crate::output;

/// Print the server's message and any raw command output it carried.
pub(crate) fn report(response: MessageResponse) {
    output::success(&response.message);
    if let Some(raw) = response.kubectl_output.filter(|s| !s.trim().is_empty()) {
        output::detail(&raw);
    }
}

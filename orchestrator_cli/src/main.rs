// Crossplane Facade CLI Client
//
// Command-line interface for the crossplane facade API.

mod client;
mod commands;
mod error;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::client::ApiClient;
use crate::commands::{block::BlockCommands, team::TeamCommands, vm::VmCommands};

#[derive(Parser)]
#[command(name = "facadectl")]
#[command(version)]
#[command(about = "Manage team VMs and volumes through the crossplane facade", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API server URL
    #[arg(
        long,
        global = true,
        default_value = "http://localhost:8080",
        env = "CROSSPLANE_FACADE_URL"
    )]
    server: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Team management commands
    Team {
        #[command(subcommand)]
        action: TeamCommands,
    },

    /// VM lifecycle commands
    Vm {
        #[command(subcommand)]
        action: VmCommands,
    },

    /// Block storage commands
    Block {
        #[command(subcommand)]
        action: BlockCommands,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = ApiClient::new(&cli.server);
    match cli.command {
        Commands::Team { action } => commands::team::execute(action, &client).await,
        Commands::Vm { action } => commands::vm::execute(action, &client).await,
        Commands::Block { action } => commands::block::execute(action, &client).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_vm_start() {
        let cli = Cli::try_parse_from(["facadectl", "vm", "start", "--team", "teamA", "vm1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Vm {
                action: VmCommands::Start(_)
            }
        ));
        assert_eq!(cli.server, "http://localhost:8080");
    }
}

//! Team commands.

use clap::Subcommand;
use serde_json::Value;

use orchestrator_shared_types::{MessageResponse, RegisterTeamRequest};

use crate::client::{ApiClient, PathPart};
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum TeamCommands {
    /// Register a team (creates its namespace)
    Register {
        /// Team name
        name: String,
    },

    /// Show the live namespace status of a team
    Show {
        /// Team name
        name: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },
}

pub async fn execute(command: TeamCommands, client: &ApiClient) -> anyhow::Result<()> {
    match command {
        TeamCommands::Register { name } => {
            let response: MessageResponse = client
                .post("/teams", &RegisterTeamRequest { name })
                .await?;
            super::report(response);
        }
        TeamCommands::Show { name, output } => {
            let path = client.path(&[PathPart::Fixed("teams"), PathPart::Name("team", &name)])?;
            let status: Value = client.get(&path).await?;
            println!("{}", output::render(&status, output)?);
        }
    }
    Ok(())
}

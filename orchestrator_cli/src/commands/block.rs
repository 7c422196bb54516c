//! Block storage commands.

use clap::Subcommand;

use orchestrator_shared_types::{CreateBlockVolumeRequest, MessageResponse};

use crate::client::{ApiClient, PathPart};

#[derive(Subcommand)]
pub enum BlockCommands {
    /// Create a block volume in a team's namespace
    Create {
        /// Team name
        #[arg(short, long)]
        team: String,

        /// Volume name
        #[arg(short, long)]
        name: String,

        /// Size in GiB
        #[arg(short, long)]
        size: u64,

        /// Free-form description
        #[arg(short, long)]
        description: Option<String>,
    },
}

pub async fn execute(command: BlockCommands, client: &ApiClient) -> anyhow::Result<()> {
    match command {
        BlockCommands::Create {
            team,
            name,
            size,
            description,
        } => {
            let path = client.path(&[
                PathPart::Fixed("teams"),
                PathPart::Name("team", &team),
                PathPart::Fixed("block"),
            ])?;
            let request = CreateBlockVolumeRequest {
                name,
                size,
                description,
            };
            let response: MessageResponse = client.post(&path, &request).await?;
            super::report(response);
        }
    }
    Ok(())
}

//! VM commands.

use clap::{Args, Subcommand};

use orchestrator_shared_types::{
    AttachDiskRequest, CreateVmRequest, MessageResponse, ResizeVmRequest, ScaleRequest, VmAction,
};

use crate::client::{ApiClient, PathPart};
use crate::error::Result;

/// Identifies one VM of one team.
#[derive(Args)]
pub struct VmTarget {
    /// Team name
    #[arg(short, long)]
    team: String,

    /// VM name
    vm: String,
}

impl VmTarget {
    fn path(&self, client: &ApiClient, suffix: Option<&'static str>) -> Result<String> {
        let mut parts = vec![
            PathPart::Fixed("teams"),
            PathPart::Name("team", &self.team),
            PathPart::Fixed("vm"),
            PathPart::Name("vm", &self.vm),
        ];
        parts.extend(suffix.map(PathPart::Fixed));
        client.path(&parts)
    }
}

#[derive(Subcommand)]
pub enum VmCommands {
    /// Provision a VM
    Create {
        /// Team name
        #[arg(short, long)]
        team: String,

        /// VM name
        name: String,

        #[arg(long)]
        image_id: String,

        #[arg(long)]
        flavor_id: String,

        #[arg(long)]
        network_id: String,

        /// Security group (can be repeated; defaults to "default")
        #[arg(long = "security-group")]
        security_groups: Vec<String>,
    },

    /// Change the flavor of a VM
    Resize {
        #[command(flatten)]
        target: VmTarget,

        #[arg(long)]
        flavor_id: String,
    },

    /// Set the replica count of a VM deployment
    Scale {
        #[command(flatten)]
        target: VmTarget,

        #[arg(long)]
        replicas: u32,
    },

    /// Attach a volume to a VM
    AttachDisk {
        #[command(flatten)]
        target: VmTarget,

        #[arg(long)]
        volume_id: String,

        #[arg(long)]
        instance_id: String,
    },

    /// Start a VM (refused while it is mid-transition)
    Start(VmTarget),

    /// Stop a VM (refused while it is mid-transition)
    Stop(VmTarget),

    /// Delete a VM after checking it is not mid-transition
    Delete(VmTarget),

    /// Delete a VM resource without checking its state
    Remove(VmTarget),
}

pub async fn execute(command: VmCommands, client: &ApiClient) -> anyhow::Result<()> {
    let response: MessageResponse = match command {
        VmCommands::Create {
            team,
            name,
            image_id,
            flavor_id,
            network_id,
            security_groups,
        } => {
            let path = client.path(&[
                PathPart::Fixed("teams"),
                PathPart::Name("team", &team),
                PathPart::Fixed("vm"),
            ])?;
            let request = CreateVmRequest {
                name,
                image_id,
                flavor_id,
                network_id,
                security_groups: (!security_groups.is_empty()).then_some(security_groups),
            };
            client.post(&path, &request).await?
        }
        VmCommands::Resize { target, flavor_id } => {
            let path = target.path(client, Some("resize"))?;
            client.put(&path, &ResizeVmRequest { flavor_id }).await?
        }
        VmCommands::Scale { target, replicas } => {
            let path = target.path(client, Some("scale"))?;
            let request = ScaleRequest {
                replicas: Some(i64::from(replicas)),
            };
            client.put(&path, &request).await?
        }
        VmCommands::AttachDisk {
            target,
            volume_id,
            instance_id,
        } => {
            let path = target.path(client, Some("attach-disk"))?;
            let request = AttachDiskRequest {
                volume_id,
                instance_id,
            };
            client.post(&path, &request).await?
        }
        VmCommands::Start(target) => run_action(client, &target, VmAction::Start).await?,
        VmCommands::Stop(target) => run_action(client, &target, VmAction::Stop).await?,
        VmCommands::Delete(target) => run_action(client, &target, VmAction::Delete).await?,
        VmCommands::Remove(target) => client.delete(&target.path(client, None)?).await?,
    };
    super::report(response);
    Ok(())
}

async fn run_action(client: &ApiClient, target: &VmTarget, action: VmAction) -> Result<MessageResponse> {
    let path = target.path(client, Some(action.as_str()))?;
    client.put_empty(&path).await
}

// Crossplane Facade API Server Binary
//
// Loads configuration, installs logging and metrics, wires the CLI command
// runner into the orchestrator and serves the HTTP API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use command_runner::{CliCommandRunner, CliRunnerConfig};
use facade_config::{FacadeConfig, CONFIG_ENV};
use observability::{init_tracing, install_prometheus, TracingConfig};
use orchestrator_api::{ApiServer, ApiState};
use orchestrator_core::{ActionOrchestrator, OrchestratorSettings};

#[derive(Parser)]
#[command(name = "crossplane-facade")]
#[command(version)]
#[command(about = "REST facade over Crossplane and OpenStack for tenant VMs", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(long, env = CONFIG_ENV)]
    config: Option<PathBuf>,
}

fn runner_config(config: &FacadeConfig) -> CliRunnerConfig {
    CliRunnerConfig {
        kubectl_binary: config.commands.kubectl.clone(),
        openstack_binary: config.commands.openstack.clone(),
        shell: config.commands.shell.clone(),
        admin_script: config.commands.admin_script.clone(),
        command_timeout: config.commands.timeout(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = FacadeConfig::load(args.config.as_deref()).context("invalid configuration")?;

    init_tracing(&TracingConfig {
        default_filter: config.logging.filter.clone(),
        json: config.logging.json,
    })
    .context("failed to initialize tracing")?;

    tracing::info!("Starting Crossplane Facade API Server");
    tracing::debug!(?config, "Effective configuration");

    let metrics = install_prometheus()?;
    let runner = Arc::new(CliCommandRunner::new(runner_config(&config)));
    let orchestrator = Arc::new(ActionOrchestrator::new(
        runner,
        OrchestratorSettings::from(&config),
    ));
    if config.orchestration.serialize_per_resource {
        tracing::info!("Actions on the same resource are serialized");
    }

    let state = ApiState::new(orchestrator).with_metrics(metrics);
    ApiServer::new(config.server.bind, state).run().await
}

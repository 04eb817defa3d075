//! WebServer operator - serves static content declared by WebServer resources

use clap::Parser;

use webserver_common::kube_utils::create_client;
use webserver_common::telemetry::init_telemetry;
use webserver_operator::config::{Cli, OperatorConfig};
use webserver_operator::controller_runner::build_webserver_controller;
use webserver_operator::startup::{crd_yaml, ensure_crd_installed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        println!("{}", crd_yaml()?);
        return Ok(());
    }

    let config = OperatorConfig::from(&cli);
    let telemetry = init_telemetry(config.telemetry.clone())?;

    let result = run_controller(config).await;
    telemetry.shutdown();
    result
}

async fn run_controller(config: OperatorConfig) -> anyhow::Result<()> {
    let client = create_client(config.kubeconfig.as_deref()).await?;

    if config.install_crd {
        ensure_crd_installed(&client).await?;
    }

    tracing::info!(
        namespace = config.namespace.as_deref().unwrap_or("*"),
        error_requeue_secs = config.requeue.error_requeue.as_secs(),
        conflict_requeue_secs = config.requeue.conflict_requeue.as_secs(),
        "Starting WebServer operator"
    );

    build_webserver_controller(client, &config).await;

    tracing::info!("Shutting down");
    Ok(())
}

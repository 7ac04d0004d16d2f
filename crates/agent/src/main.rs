//! ECS metrics agent - per-container utilization sidecar
//!
//! Runs as a sidecar container inside an ECS task, polls the local task
//! metadata endpoint, and publishes per-container utilization metrics to
//! CloudWatch.

use std::sync::Arc;
use std::time::Duration;

use agent_lib::metadata::{ClientConfig, MetadataClient};
use agent_lib::poller::{await_task_running, Poller, PollerConfig};
use agent_lib::publisher::{region_from_task_arn, CloudWatchPublisher, MetricPublisher};
use agent_lib::registry::ContainerRegistry;
use anyhow::{Context, Result};
use aws_config::Region;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!(version = AGENT_VERSION, "Starting ecs-metrics-agent");

    let config = config::AgentConfig::load()?;

    let client = Arc::new(MetadataClient::new(ClientConfig {
        base_url: config.metadata_base_url.clone(),
        ..ClientConfig::default()
    })?);

    let poller_config = PollerConfig {
        interval: Duration::from_secs(config.poll_interval_secs),
        metric_set: config.metric_set(),
        ..PollerConfig::default()
    };

    info!("Waiting for the task to be ready");
    let task = await_task_running(&client, poller_config.ready_poll_interval)
        .await
        .context("Unable to get task metadata, giving up")?;

    let registry = ContainerRegistry::from_task(&task);
    info!(
        cluster = %task.cluster,
        containers = registry.len(),
        "Container registry built"
    );

    let mut aws_config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = region_from_task_arn(&task.task_arn) {
        info!(region = %region, "Detected aws region");
        aws_config_loader = aws_config_loader.region(Region::new(region.to_string()));
    }
    let sdk_config = aws_config_loader.load().await;
    let publisher: Arc<dyn MetricPublisher> = Arc::new(CloudWatchPublisher::new(
        aws_sdk_cloudwatch::Client::new(&sdk_config),
    ));

    let poller = Poller::new(client, publisher, registry, task.cluster.clone(), poller_config);

    info!("Agent is up and running, awaiting termination signal");
    poller.run(shutdown_signal()).await;

    info!("Shutdown complete");
    Ok(())
}

/// Receiver that fires once SIGINT or SIGTERM is observed.
fn shutdown_signal() -> broadcast::Receiver<()> {
    let (tx, rx) = broadcast::channel(1);

    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install SIGINT handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received SIGINT"),
            _ = terminate => info!("Received SIGTERM"),
        }

        let _ = tx.send(());
    });

    rx
}

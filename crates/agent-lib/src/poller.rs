//! Periodic poll-compute-publish loop
//!
//! Drives the agent through its three phases: waiting for the task to report
//! RUNNING, the steady-state tick loop, and graceful shutdown. A tick fetches
//! the stats snapshot, derives utilization for every reportable container,
//! and hands the batch to the publisher. Tick failures are logged and the
//! next tick proceeds; only a readiness fetch failure is fatal.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::metadata::{MetadataClient, MetadataError};
use crate::models::{ContainerStats, MetricDatum, TaskMetadata};
use crate::publisher::{self, MetricPublisher};
use crate::registry::ContainerRegistry;
use crate::stats;

/// Which utilization metrics a tick publishes per container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSet {
    /// MemoryUtilization only
    Memory,
    /// MemoryUtilization and CPUUtilization
    MemoryAndCpu,
}

/// Configuration for the polling loop
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Interval between stats polls (default: 5 seconds)
    pub interval: Duration,
    /// Interval between readiness polls during startup (default: 1 second)
    pub ready_poll_interval: Duration,
    /// Metrics to publish per container
    pub metric_set: MetricSet,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            ready_poll_interval: Duration::from_secs(1),
            metric_set: MetricSet::Memory,
        }
    }
}

/// Poll task metadata until the task reports RUNNING.
///
/// Each fetch already carries the client's bounded retry budget, so an error
/// here means the endpoint stayed unreachable across a full retry cycle;
/// callers treat that as fatal. An endpoint that keeps answering with a
/// non-RUNNING status loops indefinitely; the orchestrator is trusted to
/// eventually report readiness or kill the task.
pub async fn await_task_running(
    client: &MetadataClient,
    poll_interval: Duration,
) -> Result<TaskMetadata, MetadataError> {
    loop {
        let task = client.fetch_task_metadata().await?;
        if task.is_running() {
            info!(cluster = %task.cluster, task_arn = %task.task_arn, "Task is running");
            return Ok(task);
        }
        debug!(known_status = %task.known_status, "Task not ready yet");
        tokio::time::sleep(poll_interval).await;
    }
}

/// Outcome of one tick
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Containers that contributed at least one datum
    pub containers_reported: usize,
    /// Containers skipped: excluded, or no stats this tick
    pub containers_skipped: usize,
    /// Whether a batch reached the publisher successfully
    pub published: bool,
}

/// Periodic poll-compute-publish driver for one task.
pub struct Poller {
    client: Arc<MetadataClient>,
    publisher: Arc<dyn MetricPublisher>,
    registry: ContainerRegistry,
    cluster_name: String,
    config: PollerConfig,
}

impl Poller {
    pub fn new(
        client: Arc<MetadataClient>,
        publisher: Arc<dyn MetricPublisher>,
        registry: ContainerRegistry,
        cluster_name: impl Into<String>,
        config: PollerConfig,
    ) -> Self {
        Self {
            client,
            publisher,
            registry,
            cluster_name: cluster_name.into(),
            config,
        }
    }

    /// Run until the shutdown receiver fires.
    ///
    /// A tick already in flight when the signal arrives completes, publish
    /// included, before the loop observes the signal; no new tick begins
    /// afterwards.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting polling loop"
        );

        let mut ticker = interval(self.config.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.tick().await;
                    debug!(
                        reported = outcome.containers_reported,
                        skipped = outcome.containers_skipped,
                        published = outcome.published,
                        "Tick complete"
                    );
                }
                _ = shutdown.recv() => {
                    info!("Shutting down polling loop");
                    break;
                }
            }
        }
    }

    /// One poll-compute-publish cycle.
    async fn tick(&self) -> TickOutcome {
        let stats_map = match self.client.fetch_task_stats().await {
            Ok(map) => map,
            Err(err) => {
                warn!(error = %err, "Unable to get task stats, skipping tick");
                return TickOutcome::default();
            }
        };

        let (batch, mut outcome) = self.build_batch(&stats_map);

        if batch.is_empty() {
            return outcome;
        }

        match self.publisher.publish(&batch).await {
            Ok(()) => outcome.published = true,
            Err(err) => {
                warn!(
                    error = %err,
                    batch_size = batch.len(),
                    "Unable to put metrics"
                );
            }
        }

        outcome
    }

    /// Derive the tick's metric batch from a stats snapshot: the pause
    /// container and entries without stats contribute nothing.
    fn build_batch(
        &self,
        stats_map: &HashMap<String, Option<ContainerStats>>,
    ) -> (Vec<MetricDatum>, TickOutcome) {
        let mut outcome = TickOutcome::default();
        let mut batch = Vec::new();

        for (container_id, container_stats) in stats_map {
            if self.registry.is_excluded(container_id) {
                outcome.containers_skipped += 1;
                continue;
            }
            let Some(container_stats) = container_stats else {
                outcome.containers_skipped += 1;
                continue;
            };

            let container_name = self.registry.display_name(container_id);
            let sample = stats::utilization(container_stats);
            batch.push(publisher::memory_datum(
                sample.memory_percent,
                &self.cluster_name,
                container_name,
            ));
            if self.config.metric_set == MetricSet::MemoryAndCpu {
                batch.push(publisher::cpu_datum(
                    sample.cpu_percent,
                    &self.cluster_name,
                    container_name,
                ));
            }
            outcome.containers_reported += 1;
        }

        (batch, outcome)
    }
}

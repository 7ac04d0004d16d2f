//! Core data models for the metrics agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task metadata returned by the `{base}/task` endpoint.
///
/// Fetched once at startup to determine readiness and topology. The snapshot
/// is only used for registry construction after `KnownStatus` reports
/// `RUNNING`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskMetadata {
    #[serde(rename = "Cluster", default)]
    pub cluster: String,
    #[serde(rename = "TaskARN", default)]
    pub task_arn: String,
    #[serde(rename = "Family", default)]
    pub family: String,
    #[serde(rename = "Revision", default)]
    pub revision: String,
    #[serde(rename = "DesiredStatus", default)]
    pub desired_status: String,
    #[serde(rename = "KnownStatus", default)]
    pub known_status: String,
    #[serde(rename = "AvailabilityZone", default)]
    pub availability_zone: String,
    #[serde(rename = "Containers", default)]
    pub containers: Vec<ContainerMetadata>,
}

impl TaskMetadata {
    /// True once the orchestrator reports the task as running.
    pub fn is_running(&self) -> bool {
        self.known_status == "RUNNING"
    }
}

/// Per-container entry in the task metadata response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerMetadata {
    #[serde(rename = "DockerId")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "DockerName", default)]
    pub docker_name: String,
    #[serde(rename = "Type", default)]
    pub container_type: String,
    #[serde(rename = "KnownStatus", default)]
    pub known_status: String,
}

impl ContainerMetadata {
    /// The CNI pause container holds the task's network namespace under
    /// awsvpc networking; its resource usage is never reported as an
    /// application metric.
    pub fn is_pause_container(&self) -> bool {
        self.container_type == "CNI_PAUSE"
    }
}

/// Point-in-time Docker stats for one container, as returned by
/// `{base}/task/stats`.
///
/// The engine embeds the previous CPU sample in `precpu_stats`, so
/// utilization can be derived from a single snapshot. Produced fresh every
/// poll tick and discarded after that tick's computation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerStats {
    #[serde(default)]
    pub memory_stats: MemoryStats,
    #[serde(default)]
    pub cpu_stats: CpuStats,
    #[serde(default)]
    pub precpu_stats: CpuStats,
}

/// Memory counters from the stats snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStats {
    #[serde(default)]
    pub usage: u64,
    #[serde(default)]
    pub limit: u64,
}

/// Cumulative CPU counters from the stats snapshot. `precpu_stats` carries
/// the same shape for the previous sample.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpuStats {
    #[serde(default)]
    pub cpu_usage: CpuUsage,
    #[serde(default)]
    pub system_cpu_usage: u64,
    #[serde(default)]
    pub online_cpus: u32,
}

/// Per-container cumulative CPU time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpuUsage {
    #[serde(default)]
    pub total_usage: u64,
    #[serde(default)]
    pub percpu_usage: Vec<u64>,
}

/// Derived CPU and memory utilization for one container at one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilizationSample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// A named, dimensioned value ready for the metrics backend.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDatum {
    pub metric_name: String,
    pub unit: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub dimensions: Vec<Dimension>,
}

/// Name/value tag attached to a metric datum for filtering and grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

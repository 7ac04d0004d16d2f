//! Metric publishing boundary
//!
//! Core code only depends on the `MetricPublisher` trait; the CloudWatch
//! implementation lives in the `cloudwatch` submodule. Datum constructors
//! here fix the namespace, metric names, unit, and dimension order for
//! everything the agent publishes.

mod cloudwatch;

pub use cloudwatch::{region_from_task_arn, CloudWatchPublisher};

use anyhow::Result;
use chrono::Utc;

use crate::models::{Dimension, MetricDatum};

pub use async_trait::async_trait;

/// Namespace for everything this agent publishes.
pub const NAMESPACE: &str = "ECS/Containers";

pub const METRIC_MEMORY_UTILIZATION: &str = "MemoryUtilization";
pub const METRIC_CPU_UTILIZATION: &str = "CPUUtilization";

pub const UNIT_PERCENT: &str = "Percent";

pub const DIMENSION_CLUSTER_NAME: &str = "ClusterName";
pub const DIMENSION_CONTAINER_NAME: &str = "ContainerName";

/// Sink for per-tick metric batches.
#[async_trait]
pub trait MetricPublisher: Send + Sync {
    /// Publish one batch. Must accept zero-to-many datums per call.
    async fn publish(&self, batch: &[MetricDatum]) -> Result<()>;
}

fn percent_datum(metric_name: &str, value: f64, cluster_name: &str, container_name: &str) -> MetricDatum {
    MetricDatum {
        metric_name: metric_name.to_string(),
        unit: UNIT_PERCENT.to_string(),
        value,
        timestamp: Utc::now(),
        dimensions: vec![
            Dimension {
                name: DIMENSION_CLUSTER_NAME.to_string(),
                value: cluster_name.to_string(),
            },
            Dimension {
                name: DIMENSION_CONTAINER_NAME.to_string(),
                value: container_name.to_string(),
            },
        ],
    }
}

/// Memory utilization datum for one container.
pub fn memory_datum(value: f64, cluster_name: &str, container_name: &str) -> MetricDatum {
    percent_datum(METRIC_MEMORY_UTILIZATION, value, cluster_name, container_name)
}

/// CPU utilization datum for one container.
pub fn cpu_datum(value: f64, cluster_name: &str, container_name: &str) -> MetricDatum {
    percent_datum(METRIC_CPU_UTILIZATION, value, cluster_name, container_name)
}

//! Agent library for ECS container utilization metrics
//!
//! This crate provides the core functionality for:
//! - Fetching task metadata and container stats from the local endpoint
//! - Deriving CPU and memory utilization from raw counters
//! - Filtering the pause container and mapping IDs to names
//! - The periodic poll-compute-publish loop
//! - The metric publishing boundary and its CloudWatch implementation

pub mod metadata;
pub mod models;
pub mod poller;
pub mod publisher;
pub mod registry;
pub mod stats;

pub use metadata::{ClientConfig, MetadataClient, MetadataError};
pub use models::*;
pub use poller::{await_task_running, MetricSet, Poller, PollerConfig};
pub use publisher::{region_from_task_arn, CloudWatchPublisher, MetricPublisher};
pub use registry::ContainerRegistry;

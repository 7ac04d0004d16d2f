//! Utilization math over raw Docker stats
//!
//! Mirrors the docker CLI's derivation: memory is usage over limit, CPU is
//! the delta of the container's cumulative counter against the system-wide
//! counter between the current and previous sample, scaled by the number of
//! online CPUs. Both functions are total; no input produces an error.

use crate::models::{ContainerStats, UtilizationSample};

/// Memory utilization in percent.
///
/// A zero limit (unlimited cgroup) reports 0.0 rather than dividing by zero.
pub fn memory_utilization(stats: &ContainerStats) -> f64 {
    if stats.memory_stats.limit == 0 {
        return 0.0;
    }
    stats.memory_stats.usage as f64 / stats.memory_stats.limit as f64 * 100.0
}

/// CPU utilization in percent across all online CPUs.
///
/// Both deltas must be strictly positive; counter resets and first-sample
/// snapshots (where `precpu_stats` is zeroed) report 0.0. When the engine
/// does not report `online_cpus`, the per-CPU usage list length stands in.
pub fn cpu_utilization(stats: &ContainerStats) -> f64 {
    let cpu_delta = stats.cpu_stats.cpu_usage.total_usage as f64
        - stats.precpu_stats.cpu_usage.total_usage as f64;
    let system_delta =
        stats.cpu_stats.system_cpu_usage as f64 - stats.precpu_stats.system_cpu_usage as f64;

    let online_cpus = if stats.cpu_stats.online_cpus > 0 {
        stats.cpu_stats.online_cpus as usize
    } else {
        stats.cpu_stats.cpu_usage.percpu_usage.len()
    };

    if cpu_delta > 0.0 && system_delta > 0.0 {
        cpu_delta / system_delta * online_cpus as f64 * 100.0
    } else {
        0.0
    }
}

/// Both utilization values for one snapshot.
pub fn utilization(stats: &ContainerStats) -> UtilizationSample {
    UtilizationSample {
        cpu_percent: cpu_utilization(stats),
        memory_percent: memory_utilization(stats),
    }
}

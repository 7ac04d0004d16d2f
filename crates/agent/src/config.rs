//! Agent configuration

use agent_lib::poller::MetricSet;
use anyhow::Result;
use serde::Deserialize;

/// Environment variable the orchestrator injects with the metadata endpoint
/// base URL.
pub const METADATA_URI_ENV_VAR: &str = "ECS_CONTAINER_METADATA_URI";

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the task metadata endpoint
    #[serde(default = "default_metadata_base_url")]
    pub metadata_base_url: String,

    /// Stats poll interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Which metrics to publish: "memory" or "memory-and-cpu"
    #[serde(default = "default_metric_set")]
    pub metric_set: String,
}

fn default_metadata_base_url() -> String {
    std::env::var(METADATA_URI_ENV_VAR).unwrap_or_default()
}

fn default_poll_interval() -> u64 {
    5
}

fn default_metric_set() -> String {
    "memory".to_string()
}

impl AgentConfig {
    /// Load configuration from `AGENT_`-prefixed environment variables, with
    /// the metadata base URL falling back to the orchestrator-provided
    /// variable.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("AGENT").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| AgentConfig {
            metadata_base_url: default_metadata_base_url(),
            poll_interval_secs: default_poll_interval(),
            metric_set: default_metric_set(),
        }))
    }

    /// Parsed metric set; unrecognized values fall back to memory-only.
    pub fn metric_set(&self) -> MetricSet {
        match self.metric_set.as_str() {
            "memory-and-cpu" => MetricSet::MemoryAndCpu,
            _ => MetricSet::Memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_metric_set(metric_set: &str) -> AgentConfig {
        AgentConfig {
            metadata_base_url: String::new(),
            poll_interval_secs: 5,
            metric_set: metric_set.to_string(),
        }
    }

    #[test]
    fn test_metric_set_parsing() {
        assert_eq!(config_with_metric_set("memory").metric_set(), MetricSet::Memory);
        assert_eq!(
            config_with_metric_set("memory-and-cpu").metric_set(),
            MetricSet::MemoryAndCpu
        );
    }

    #[test]
    fn test_unknown_metric_set_falls_back_to_memory() {
        assert_eq!(config_with_metric_set("everything").metric_set(), MetricSet::Memory);
    }
}

//! Container identity within a task
//!
//! Built once from the startup task metadata. The container set of a task
//! does not change at runtime, so the registry is immutable after
//! construction and safe to share by reference.

use std::collections::HashMap;

use tracing::info;

use crate::models::TaskMetadata;

/// Maps container IDs to display names and identifies the pause container.
#[derive(Debug, Clone)]
pub struct ContainerRegistry {
    names: HashMap<String, String>,
    pause_container_id: Option<String>,
}

impl ContainerRegistry {
    /// Build the registry from a RUNNING task metadata snapshot.
    ///
    /// At most one pause container is expected; tasks in bridge or host
    /// networking mode have none, and then no container is excluded.
    pub fn from_task(task: &TaskMetadata) -> Self {
        let mut names = HashMap::new();
        let mut pause_container_id = None;

        for container in &task.containers {
            if container.is_pause_container() {
                info!(
                    container_id = %container.id,
                    "Detected pause container, awsvpc networking mode is enabled"
                );
                pause_container_id = Some(container.id.clone());
            }
            names.insert(container.id.clone(), container.docker_name.clone());
        }

        Self {
            names,
            pause_container_id,
        }
    }

    /// True iff this is the pause container, whose stats are never published.
    pub fn is_excluded(&self, container_id: &str) -> bool {
        self.pause_container_id.as_deref() == Some(container_id)
    }

    /// Display name for a container; empty for unknown IDs so a stale stats
    /// entry cannot fail the tick.
    pub fn display_name(&self, container_id: &str) -> &str {
        self.names
            .get(container_id)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Number of known containers, pause container included.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

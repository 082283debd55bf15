use std::{fs, path::Path};

use anyhow::Context;
use dxf_core::ManagerConfig;
use dxf_model::Task;
use dxf_observe::LoggerConfig;
use serde::{Deserialize, Serialize};

/// Agent configuration, read from an optional JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Port that, together with the hostname, forms the node identity.
    pub port: u16,
    /// Overrides the derived node identity.
    pub exec_id: Option<String>,
    pub logger: LoggerConfig,
    pub manager: ManagerConfig,
    /// Time one demo subtask takes.
    pub subtask_ms: u64,
    /// Tasks seeded into the in-memory registry, each with `subtasks` subtasks on this node.
    pub tasks: Vec<Task>,
    pub subtasks: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            port: 4000,
            exec_id: None,
            logger: LoggerConfig::default(),
            manager: ManagerConfig::default(),
            subtask_ms: 1_000,
            tasks: Vec::new(),
            subtasks: 3,
        }
    }
}

impl AgentConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seed_tasks() {
        let cfg: AgentConfig = serde_json::from_str(
            r#"{
                "port": 4100,
                "manager": {"check_interval_ms": 100},
                "tasks": [{"id": 1, "taskType": "sleep", "state": "running", "concurrency": 2}]
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.port, 4100);
        assert_eq!(cfg.manager.check_interval_ms, 100);
        assert_eq!(cfg.manager.retry_times, 30);
        assert_eq!(cfg.tasks.len(), 1);
        assert_eq!(cfg.subtasks, 3);
    }
}

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{Slots, TaskId, TaskState, TaskType};

/// Snapshot of a task as fetched from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    /// Human-readable unique key.
    #[serde(default)]
    pub key: String,
    pub task_type: TaskType,
    pub state: TaskState,
    /// Larger values are more important.
    #[serde(default)]
    pub priority: i32,
    /// Capacity units the task needs on this node.
    pub concurrency: Slots,
    /// Creation time in unix milliseconds, used to break priority ties.
    #[serde(default)]
    pub create_time_ms: u64,
}

impl Task {
    pub fn new(id: i64, task_type: impl Into<TaskType>, concurrency: Slots) -> Self {
        let id = TaskId::new(id);
        Self {
            key: format!("task-{id}"),
            id,
            task_type: task_type.into(),
            state: TaskState::Running,
            priority: 0,
            concurrency,
            create_time_ms: 0,
        }
    }

    pub fn with_state(mut self, state: TaskState) -> Self {
        self.state = state;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_create_time_ms(mut self, ms: u64) -> Self {
        self.create_time_ms = ms;
        self
    }

    /// Scheduling order: `Less` means `self` is more important than `other`.
    ///
    /// Higher priority first, then the earlier created task, then the smaller id.
    pub fn rank_cmp(&self, other: &Task) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.create_time_ms.cmp(&other.create_time_ms))
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Returns `true` if `self` must be served before `other`.
    #[inline]
    pub fn outranks(&self, other: &Task) -> bool {
        self.rank_cmp(other) == Ordering::Less
    }
}

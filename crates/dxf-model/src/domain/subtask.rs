use serde::{Deserialize, Serialize};

use crate::{ExecId, TaskId};

/// State of a node-scoped portion of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubtaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Paused,
}

impl SubtaskState {
    /// Pending or running subtasks are the ones a pause or failure applies to.
    pub fn is_unfinished(&self) -> bool {
        matches!(self, SubtaskState::Pending | SubtaskState::Running)
    }
}

/// A unit of work belonging to a task, assigned to one execution node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: i64,
    pub task_id: TaskId,
    pub exec_id: ExecId,
    pub state: SubtaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Subtask {
    pub fn pending(id: i64, task_id: TaskId, exec_id: impl Into<ExecId>) -> Self {
        Self {
            id,
            task_id,
            exec_id: exec_id.into(),
            state: SubtaskState::Pending,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfinished_states() {
        assert!(SubtaskState::Pending.is_unfinished());
        assert!(SubtaskState::Running.is_unfinished());

        assert!(!SubtaskState::Paused.is_unfinished());
        assert!(!SubtaskState::Canceled.is_unfinished());
        assert!(!SubtaskState::Failed.is_unfinished());
    }

    #[test]
    fn error_is_omitted_when_absent() {
        let subtask = Subtask::pending(1, TaskId::new(7), "node-a:4000");
        let json = serde_json::to_string(&subtask).unwrap();
        assert!(!json.contains("error"));
        assert!(json.contains(r#""execId":"node-a:4000""#));
    }
}

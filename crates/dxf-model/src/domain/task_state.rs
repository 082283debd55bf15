use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registry-side state of a task.
///
/// Only [`TaskState::Running`], [`TaskState::Reverting`] and [`TaskState::Pausing`]
/// are acted upon by an execution node; the rest are either not yet scheduled or final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskState {
    Pending,
    Running,
    Reverting,
    Pausing,
    Paused,
    Succeeded,
    Failed,
    Reverted,
    Canceled,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown task state: {0}")]
pub struct ParseStateError(pub String);

impl TaskState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Reverting => "reverting",
            TaskState::Pausing => "pausing",
            TaskState::Paused => "paused",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
            TaskState::Reverted => "reverted",
            TaskState::Canceled => "canceled",
        }
    }

    /// Returns `true` if an execution node must drive an executor for this state.
    pub fn is_executable(&self) -> bool {
        matches!(self, TaskState::Running | TaskState::Reverting)
    }

    /// Returns `true` if execution nodes act on a task in this state at all.
    pub fn is_dispatched(&self) -> bool {
        self.is_executable() || *self == TaskState::Pausing
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let state = match s.trim().to_ascii_lowercase().as_str() {
            "pending" => TaskState::Pending,
            "running" => TaskState::Running,
            "reverting" => TaskState::Reverting,
            "pausing" => TaskState::Pausing,
            "paused" => TaskState::Paused,
            "succeeded" => TaskState::Succeeded,
            "failed" => TaskState::Failed,
            "reverted" => TaskState::Reverted,
            "canceled" | "cancelled" => TaskState::Canceled,
            _ => return Err(ParseStateError(s.to_string())),
        };
        Ok(state)
    }
}

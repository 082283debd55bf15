use std::fmt;

use serde::{Deserialize, Serialize};

/// Type tag selecting which executor implementation drives a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskType(String);

impl TaskType {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskType {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl From<String> for TaskType {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

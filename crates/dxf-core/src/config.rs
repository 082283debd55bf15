use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables of the executor [`crate::Manager`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// How often the task registry is polled for tasks of this node.
    pub check_interval_ms: u64,
    /// How often the node identity record is re-asserted.
    pub recover_meta_interval_ms: u64,
    /// Attempts per meta init/recover invocation.
    pub retry_times: u32,
    /// Pause between two attempts.
    pub retry_interval_ms: u64,
    /// Service scope recorded next to the node identity.
    pub scope: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 300,
            recover_meta_interval_ms: 90_000,
            retry_times: 30,
            retry_interval_ms: 500,
            scope: String::new(),
        }
    }
}

impl ManagerConfig {
    #[inline]
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms.max(1))
    }

    #[inline]
    pub fn recover_meta_interval(&self) -> Duration {
        Duration::from_millis(self.recover_meta_interval_ms.max(1))
    }

    #[inline]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            times: self.retry_times,
            interval: Duration::from_millis(self.retry_interval_ms),
        }
    }
}

/// Bounded attempts with a fixed pause in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub times: u32,
    pub interval: Duration,
}

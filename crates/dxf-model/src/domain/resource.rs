use serde::{Deserialize, Serialize};

use crate::Slots;

/// Capacity granted to one executor for its whole lifetime.
///
/// Memory is sized in the same proportion of the node as the CPU grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResource {
    pub cpu: Slots,
    pub mem_bytes: u64,
}

impl StepResource {
    /// `mem = concurrency / total_cpu * total_mem`.
    pub fn proportional(concurrency: Slots, total_cpu: Slots, total_mem: u64) -> Self {
        let mem_bytes = if total_cpu == 0 {
            0
        } else {
            (concurrency as f64 / total_cpu as f64 * total_mem as f64) as u64
        };
        Self {
            cpu: concurrency,
            mem_bytes,
        }
    }
}

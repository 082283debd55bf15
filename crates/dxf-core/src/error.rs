use dxf_model::{Slots, TaskType};
use thiserror::Error;

/// Errors raised by the node-local control plane itself.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid cpu or memory, cpu: {cpu}, memory: {mem_bytes}")]
    InvalidCapacity { cpu: Slots, mem_bytes: u64 },

    #[error("failed to discover host capacity: {0}")]
    CapacityDiscovery(String),

    #[error("task type {0} not found")]
    UnknownTaskType(TaskType),

    #[error("manager already started")]
    AlreadyStarted,

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Failures reported by a [`crate::TaskTable`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("task table unavailable: {0}")]
    Unavailable(String),

    #[error("task {0} not found")]
    TaskNotFound(i64),

    #[error("operation canceled")]
    Canceled,

    #[error("task table error: {0}")]
    Other(String),
}

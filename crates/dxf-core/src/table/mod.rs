//! Contract of the central task registry as seen from one execution node.
mod memory;
pub use memory::{MemoryTaskTable, TableOp};

use async_trait::async_trait;
use dxf_model::{Task, TaskId};

use crate::error::TableError;

/// Registry operations the manager depends on.
///
/// Meta operations are idempotent upserts and may be raced freely.
#[async_trait]
pub trait TaskTable: Send + Sync {
    /// Register this node's identity record.
    async fn init_meta(&self, exec_id: &str, scope: &str) -> Result<(), TableError>;

    /// Re-insert this node's identity record if the registry dropped it.
    async fn recover_meta(&self, exec_id: &str, scope: &str) -> Result<(), TableError>;

    /// Tasks with subtasks assigned to `exec_id`, most important first.
    async fn get_task_exec_info_by_exec_id(&self, exec_id: &str) -> Result<Vec<Task>, TableError>;

    /// Move the pending/running subtasks of `task_id` on `exec_id` to paused.
    ///
    /// Affecting zero rows is not an error.
    async fn pause_subtasks(&self, exec_id: &str, task_id: TaskId) -> Result<(), TableError>;

    /// Persist a terminal failure for the subtasks of `task_id` on `exec_id`.
    async fn fail_subtask(&self, exec_id: &str, task_id: TaskId, error: &str) -> Result<(), TableError>;
}

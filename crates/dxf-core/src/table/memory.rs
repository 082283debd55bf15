use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;
use dxf_model::{ExecId, Subtask, SubtaskState, Task, TaskId, TaskState};
use tracing::trace;

use crate::{error::TableError, table::TaskTable};

/// Registry operations that can be observed and made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableOp {
    InitMeta,
    RecoverMeta,
    GetTasks,
    PauseSubtasks,
    FailSubtask,
}

/// In-memory task registry.
///
/// Stands in for the central registry in single-process deployments and tests.
/// Failures can be injected per operation to exercise retry paths.
#[derive(Clone, Default)]
pub struct MemoryTaskTable {
    inner: Arc<RwLock<TableInner>>,
}

#[derive(Default)]
struct TableInner {
    tasks: HashMap<TaskId, Task>,
    subtasks: HashMap<i64, Subtask>,
    /// Index: exec id -> subtask ids assigned to that node.
    by_exec: HashMap<ExecId, Vec<i64>>,
    /// Node identity records: exec id -> scope.
    meta: HashMap<ExecId, String>,
    /// Remaining injected failures per operation.
    failures: HashMap<TableOp, u32>,
    calls: HashMap<TableOp, u32>,
    next_subtask_id: i64,
}

impl MemoryTaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, TableInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TableInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a task.
    pub fn add_task(&self, task: Task) {
        self.write().tasks.insert(task.id, task);
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.read().tasks.get(&id).cloned()
    }

    pub fn set_task_state(&self, id: TaskId, state: TaskState) -> Result<(), TableError> {
        let mut inner = self.write();
        let task = inner
            .tasks
            .get_mut(&id)
            .ok_or(TableError::TaskNotFound(id.get()))?;
        task.state = state;
        Ok(())
    }

    /// Assign a new pending subtask of `task_id` to `exec_id`; returns its id.
    pub fn add_subtask(&self, task_id: TaskId, exec_id: &str) -> i64 {
        let mut inner = self.write();
        inner.next_subtask_id += 1;
        let id = inner.next_subtask_id;
        inner
            .subtasks
            .insert(id, Subtask::pending(id, task_id, exec_id));
        inner.by_exec.entry(exec_id.to_string()).or_default().push(id);
        id
    }

    pub fn subtask(&self, id: i64) -> Option<Subtask> {
        self.read().subtasks.get(&id).cloned()
    }

    /// Subtasks of `task_id` assigned to `exec_id`, in creation order.
    pub fn subtasks_of(&self, exec_id: &str, task_id: TaskId) -> Vec<Subtask> {
        let inner = self.read();
        inner
            .by_exec
            .get(exec_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.subtasks.get(id))
                    .filter(|s| s.task_id == task_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Claim the next pending subtask of `task_id` on `exec_id`, marking it running.
    pub fn start_next_subtask(&self, exec_id: &str, task_id: TaskId) -> Option<Subtask> {
        let mut inner = self.write();
        let id = inner.by_exec.get(exec_id)?.iter().copied().find(|id| {
            inner
                .subtasks
                .get(id)
                .is_some_and(|s| s.task_id == task_id && s.state == SubtaskState::Pending)
        })?;
        let subtask = inner.subtasks.get_mut(&id)?;
        subtask.state = SubtaskState::Running;
        Some(subtask.clone())
    }

    /// Set the state of one subtask; returns `false` if it does not exist.
    pub fn update_subtask_state(&self, id: i64, state: SubtaskState) -> bool {
        match self.write().subtasks.get_mut(&id) {
            Some(subtask) => {
                subtask.state = state;
                true
            }
            None => false,
        }
    }

    pub fn has_meta(&self, exec_id: &str) -> bool {
        self.read().meta.contains_key(exec_id)
    }

    pub fn meta_scope(&self, exec_id: &str) -> Option<String> {
        self.read().meta.get(exec_id).cloned()
    }

    /// Drop the identity record of `exec_id`, as the registry does for long-lost nodes.
    pub fn remove_meta(&self, exec_id: &str) {
        self.write().meta.remove(exec_id);
    }

    /// Make the next `times` calls of `op` fail with [`TableError::Unavailable`].
    pub fn fail_next(&self, op: TableOp, times: u32) {
        self.write().failures.insert(op, times);
    }

    /// Number of calls of `op` so far, failed ones included.
    pub fn calls(&self, op: TableOp) -> u32 {
        self.read().calls.get(&op).copied().unwrap_or(0)
    }

    fn enter(&self, op: TableOp) -> Result<RwLockWriteGuard<'_, TableInner>, TableError> {
        let mut inner = self.write();
        *inner.calls.entry(op).or_default() += 1;
        if let Some(left) = inner.failures.get_mut(&op)
            && *left > 0
        {
            *left -= 1;
            return Err(TableError::Unavailable(format!("injected {op:?} failure")));
        }
        Ok(inner)
    }

    fn upsert_meta(&self, op: TableOp, exec_id: &str, scope: &str) -> Result<(), TableError> {
        let mut inner = self.enter(op)?;
        inner.meta.insert(exec_id.to_string(), scope.to_string());
        trace!(exec_id, scope, ?op, "meta upserted");
        Ok(())
    }

    /// Apply `state` to the unfinished subtasks of `task_id` on `exec_id`.
    fn transition_unfinished(
        inner: &mut TableInner,
        exec_id: &str,
        task_id: TaskId,
        state: SubtaskState,
        error: Option<&str>,
    ) -> usize {
        let Some(ids) = inner.by_exec.get(exec_id) else {
            return 0;
        };
        let mut affected = 0;
        for id in ids {
            if let Some(subtask) = inner.subtasks.get_mut(id)
                && subtask.task_id == task_id
                && subtask.state.is_unfinished()
            {
                subtask.state = state;
                subtask.error = error.map(str::to_string);
                affected += 1;
            }
        }
        affected
    }
}

#[async_trait]
impl TaskTable for MemoryTaskTable {
    async fn init_meta(&self, exec_id: &str, scope: &str) -> Result<(), TableError> {
        self.upsert_meta(TableOp::InitMeta, exec_id, scope)
    }

    async fn recover_meta(&self, exec_id: &str, scope: &str) -> Result<(), TableError> {
        self.upsert_meta(TableOp::RecoverMeta, exec_id, scope)
    }

    async fn get_task_exec_info_by_exec_id(&self, exec_id: &str) -> Result<Vec<Task>, TableError> {
        let inner = self.enter(TableOp::GetTasks)?;
        let Some(ids) = inner.by_exec.get(exec_id) else {
            return Ok(Vec::new());
        };

        let mut tasks: Vec<Task> = Vec::new();
        for subtask in ids.iter().filter_map(|id| inner.subtasks.get(id)) {
            if !subtask.state.is_unfinished() || tasks.iter().any(|t| t.id == subtask.task_id) {
                continue;
            }
            if let Some(task) = inner.tasks.get(&subtask.task_id)
                && task.state.is_dispatched()
            {
                tasks.push(task.clone());
            }
        }
        tasks.sort_by(|a, b| a.rank_cmp(b));
        Ok(tasks)
    }

    async fn pause_subtasks(&self, exec_id: &str, task_id: TaskId) -> Result<(), TableError> {
        let mut inner = self.enter(TableOp::PauseSubtasks)?;
        let affected =
            Self::transition_unfinished(&mut inner, exec_id, task_id, SubtaskState::Paused, None);
        trace!(exec_id, %task_id, affected, "subtasks paused");
        Ok(())
    }

    async fn fail_subtask(&self, exec_id: &str, task_id: TaskId, error: &str) -> Result<(), TableError> {
        let mut inner = self.enter(TableOp::FailSubtask)?;
        let affected = Self::transition_unfinished(
            &mut inner,
            exec_id,
            task_id,
            SubtaskState::Failed,
            Some(error),
        );
        trace!(exec_id, %task_id, affected, "subtasks failed");
        Ok(())
    }
}

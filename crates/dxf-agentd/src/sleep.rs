//! Demo task type: every subtask is a fixed sleep.
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use dxf_core::{BuildContext, ExecutorFactory, MemoryTaskTable, TaskExecutor};
use dxf_model::{StepResource, SubtaskState, Task};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const TASK_TYPE: &str = "sleep";

pub struct SleepFactory {
    pub table: MemoryTaskTable,
    pub subtask: Duration,
}

impl ExecutorFactory for SleepFactory {
    fn build(&self, ctx: &BuildContext, task: Task) -> Arc<dyn TaskExecutor> {
        Arc::new(SleepExecutor {
            exec_id: ctx.exec_id.clone(),
            table: self.table.clone(),
            subtask: self.subtask,
            stop: ctx.ctx.child_token(),
            current: Mutex::new(None),
            task,
        })
    }
}

struct SleepExecutor {
    task: Task,
    exec_id: String,
    table: MemoryTaskTable,
    subtask: Duration,
    stop: CancellationToken,
    /// Running subtask id and the token that cancels only it.
    current: Mutex<Option<(i64, CancellationToken)>>,
}

impl SleepExecutor {
    fn set_current(&self, value: Option<(i64, CancellationToken)>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Clear the running subtask; `true` if it was canceled meanwhile.
    ///
    /// `cancel_running_subtask` marks and cancels under the same lock, so once
    /// this returns `false` the subtask can no longer be marked canceled.
    fn finish_current(&self, token: &CancellationToken) -> bool {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = None;
        token.is_cancelled()
    }
}

#[async_trait]
impl TaskExecutor for SleepExecutor {
    async fn init(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        anyhow::ensure!(self.task.concurrency > 0, "sleep task needs concurrency > 0");
        Ok(())
    }

    async fn run(&self, resource: StepResource) {
        info!(task_id = %self.task.id, cpu = resource.cpu, mem = resource.mem_bytes, "sleep executor running");
        while let Some(subtask) = self.table.start_next_subtask(&self.exec_id, self.task.id) {
            let token = self.stop.child_token();
            self.set_current(Some((subtask.id, token.clone())));

            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(self.subtask) => {}
            }

            if !self.finish_current(&token) {
                self.table.update_subtask_state(subtask.id, SubtaskState::Succeeded);
                debug!(task_id = %self.task.id, subtask_id = subtask.id, "subtask succeeded");
            } else if self.stop.is_cancelled() {
                return;
            }
        }
    }

    fn cancel(&self) {
        self.stop.cancel();
    }

    fn cancel_running_subtask(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((id, token)) = current.take() {
            self.table.update_subtask_state(id, SubtaskState::Canceled);
            token.cancel();
        }
    }

    async fn close(&self) {
        debug!(task_id = %self.task.id, "sleep executor closed");
    }

    fn is_retryable_error(&self, _err: &anyhow::Error) -> bool {
        false
    }

    fn task(&self) -> &Task {
        &self.task
    }
}

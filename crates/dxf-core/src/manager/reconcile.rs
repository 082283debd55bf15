use dxf_model::{Task, TaskId, TaskState};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{Instrument, debug, error, info};

use crate::{error::TableError, manager::Manager, slot::Admission};

impl Manager {
    /// Handle tasks of interesting states:
    ///   - running/reverting: start the task executor.
    ///   - reverting: additionally cancel the running subtask of a live executor.
    ///   - pausing: cancel the task executor and pause the unfinished subtasks of this node.
    ///
    /// Pausing is handled on every node so that no subtask keeps running
    /// once the registry marks the task paused.
    pub(super) async fn handle_tasks_loop(self) {
        let period = self.inner.config.check_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.inner.ctx.cancelled() => {
                    info!(exec_id = %self.inner.id, "handle tasks loop done");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let round = self.clone();
            let round = async move { round.handle_tasks().await };
            if let Err(err) = tokio::spawn(round.in_current_span()).await
                && err.is_panic()
            {
                error!(exec_id = %self.inner.id, "handle tasks round panicked; continuing");
            }
        }
    }

    /// Run one reconciliation round.
    pub async fn handle_tasks(&self) {
        let tasks = match self
            .inner
            .table
            .get_task_exec_info_by_exec_id(&self.inner.id)
            .await
        {
            Ok(tasks) => tasks,
            Err(err) => {
                self.log_err(&err);
                return;
            }
        };

        let mut executable = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.state {
                state if state.is_executable() => {
                    if state == TaskState::Reverting {
                        self.cancel_running_subtask_of(task.id);
                    }
                    // Reverting also needs an executor to run the rollback.
                    if !self.is_executor_started(task.id) {
                        executable.push(task);
                    }
                }
                TaskState::Pausing => {
                    if let Err(err) = self.handle_pausing_task(task.id).await {
                        self.log_err(&err);
                    }
                }
                _ => {}
            }
        }

        if !executable.is_empty() {
            self.handle_executable_tasks(executable).await;
        }
    }

    /// Admit candidates in registry order.
    ///
    /// A candidate that needs evictions stops the round so that lower-ranked
    /// candidates cannot take the slots being freed.
    async fn handle_executable_tasks(&self, tasks: Vec<Task>) {
        for task in tasks {
            let admission = self.read_live().slots.can_alloc(&task);
            match admission {
                Admission::Admit => self.start_task_executor(task).await,
                Admission::Preempt(victims) => {
                    info!(
                        task_id = %task.id,
                        evicted = victims.len(),
                        "preempting lower priority tasks"
                    );
                    self.inner.metrics.preempted(victims.len());
                    self.cancel_task_executors(&victims);
                    break;
                }
                Admission::Deny => {
                    debug!(task_id = %task.id, "no enough slots to run task");
                }
            }
        }
    }

    /// Cancel the running subtask of a live executor; the subtask becomes canceled.
    fn cancel_running_subtask_of(&self, task_id: TaskId) {
        let live = self.read_live();
        if let Some(executor) = live.executors.get(&task_id) {
            info!(%task_id, "cancel running subtask of reverting task");
            executor.cancel_running_subtask();
        }
    }

    /// Cancel the executor and pause the unfinished subtasks of this node.
    ///
    /// The pause is requested even without a local executor: subtasks may have
    /// been moved here before any executor started.
    async fn handle_pausing_task(&self, task_id: TaskId) -> Result<(), TableError> {
        info!(%task_id, "handle pausing task");
        {
            let live = self.read_live();
            if let Some(executor) = live.executors.get(&task_id) {
                executor.cancel();
            }
        }
        self.inner.table.pause_subtasks(&self.inner.id, task_id).await
    }

    /// Cancel executors without touching subtask state.
    fn cancel_task_executors(&self, tasks: &[Task]) {
        let live = self.read_live();
        for task in tasks {
            info!(task_id = %task.id, "cancel task executor");
            if let Some(executor) = live.executors.get(&task.id) {
                executor.cancel();
            }
        }
    }
}

use std::{fmt::Display, sync::Arc};

use dxf_model::{StepResource, Task, TaskId};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{Instrument, error, info, warn};

use crate::{
    error::TableError,
    executor::{BuildContext, TaskExecutor},
    manager::Manager,
    metrics::StartFailure,
    retry::Retry,
};

impl Manager {
    /// Build, init and launch the executor of an admitted task.
    pub(super) async fn start_task_executor(&self, task: Task) {
        let inner = &self.inner;
        let bctx = BuildContext {
            exec_id: inner.id.clone(),
            ctx: inner.ctx.clone(),
            table: Arc::clone(&inner.table),
        };
        let executor = match inner.registry.build(&bctx, task.clone()) {
            Ok(executor) => executor,
            Err(err) => {
                self.log_err_and_persist(&anyhow::Error::from(err), &task, None)
                    .await;
                return;
            }
        };
        if let Err(err) = executor.init(&inner.ctx).await {
            self.log_err_and_persist(&err, &task, Some(&executor)).await;
            return;
        }

        let resource = StepResource::proportional(
            task.concurrency,
            inner.capacity.cpu,
            inner.capacity.mem_bytes,
        );
        let remaining = {
            let mut live = self.write_live();
            if inner.ctx.is_cancelled() {
                None
            } else if live.executors.contains_key(&task.id) || !live.slots.alloc(&task) {
                warn!(task_id = %task.id, "slots changed since admission; task deferred");
                None
            } else {
                live.executors.insert(task.id, Arc::clone(&executor));
                let drive = self.clone().drive(Arc::clone(&executor), resource);
                inner.executors.spawn(drive.in_current_span());
                Some(live.slots.available_slots())
            }
        };
        let Some(remaining) = remaining else {
            executor.close().await;
            return;
        };

        inner.metrics.executor_started(&task.task_type);
        inner.metrics.available_slots(remaining);
        info!(
            task_id = %task.id,
            task_type = %task.task_type,
            cpu = resource.cpu,
            mem = resource.mem_bytes,
            remaining_slots = remaining,
            "task executor started"
        );
    }

    /// Run the executor to completion, then release it whatever happened.
    async fn drive(self, executor: Arc<dyn TaskExecutor>, resource: StepResource) {
        let task = executor.task().clone();
        let runner = Arc::clone(&executor);
        let outcome = tokio::spawn(async move { runner.run(resource).await }.in_current_span())
            .await;
        if let Err(err) = outcome {
            error!(task_id = %task.id, task_type = %task.task_type, error = %err, "task executor aborted");
        }

        info!(task_id = %task.id, task_type = %task.task_type, "task executor exit");
        let remaining = self.release(task.id);
        self.inner.metrics.executor_exited(&task.task_type);
        self.inner.metrics.available_slots(remaining);
        executor.close().await;
    }

    /// Free the slots of `task_id`, then drop it from the live set.
    fn release(&self, task_id: TaskId) -> usize {
        let mut live = self.write_live();
        live.slots.free(task_id);
        live.executors.remove(&task_id);
        live.slots.available_slots()
    }

    /// Re-insert the identity record of this node, with bounded retries.
    pub async fn recover_meta(&self) -> Result<(), TableError> {
        let inner = &self.inner;
        let mut retry = Retry::new(inner.config.retry_policy());
        retry
            .run(&inner.ctx, "recover meta", || {
                inner.table.recover_meta(&inner.id, &inner.config.scope)
            })
            .await
    }

    /// Keep the identity record alive.
    ///
    /// After a long network partition the registry may delete the record of
    /// this node; once connectivity is back it has to be inserted again.
    pub(super) async fn recover_meta_loop(self) {
        let period = self.inner.config.recover_meta_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.inner.ctx.cancelled() => {
                    info!(exec_id = %self.inner.id, "recover meta loop done");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let tick = self.clone();
            let tick = async move { tick.recover_meta().await };
            match tokio::spawn(tick.in_current_span()).await {
                Ok(Ok(())) => {}
                Ok(Err(TableError::Canceled)) => {}
                Ok(Err(err)) => {
                    self.inner.metrics.meta_recover_failed();
                    self.log_err(&err);
                }
                Err(err) => {
                    error!(exec_id = %self.inner.id, error = %err, "recover meta tick panicked; continuing");
                }
            }
        }
    }

    pub(super) fn log_err(&self, err: &dyn Display) {
        error!(exec_id = %self.inner.id, error = %err, "task manager met error");
    }

    /// Log a start failure and, unless retryable, persist it on the subtasks.
    async fn log_err_and_persist(
        &self,
        err: &anyhow::Error,
        task: &Task,
        executor: Option<&Arc<dyn TaskExecutor>>,
    ) {
        let inner = &self.inner;
        self.log_err(err);

        // Executors may do work in init that needs a retry; let them decide.
        let reason = match executor {
            Some(executor) if executor.is_retryable_error(err) => {
                error!(task_id = %task.id, error = %err, "met retryable err");
                inner
                    .metrics
                    .start_failed(&task.task_type, StartFailure::InitRetryable);
                return;
            }
            Some(_) => StartFailure::InitFatal,
            None => StartFailure::UnknownType,
        };
        inner.metrics.start_failed(&task.task_type, reason);

        let message = format!("{err:#}");
        match inner.table.fail_subtask(&inner.id, task.id, &message).await {
            Ok(()) => error!(task_id = %task.id, error = %message, "update error to subtask"),
            Err(err1) => error!(task_id = %task.id, error = %err1, "update to subtask failed"),
        }
    }
}

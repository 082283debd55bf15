//! Lifecycle contract every task type implements, and the factories building them.
mod registry;
pub use registry::ExecutorRegistry;

use std::sync::Arc;

use async_trait::async_trait;
use dxf_model::{ExecId, StepResource, Task};
use tokio_util::sync::CancellationToken;

use crate::table::TaskTable;

/// Live driver of one task on this node.
///
/// The manager calls `init` once, then `run` on its own tokio task, and
/// `close` exactly once after `run` returned, however it returned. An executor
/// that initialized but could not be launched is closed without running.
/// `cancel` and `cancel_running_subtask` may be called concurrently with `run`
/// and must only signal; the executor observes the signal and exits on its own.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// One-time setup. Failures are classified by [`TaskExecutor::is_retryable_error`].
    async fn init(&self, ctx: &CancellationToken) -> anyhow::Result<()>;

    /// Drive the task until its work is done, fails or is canceled.
    ///
    /// Outcomes are reported through the task registry, not returned.
    async fn run(&self, resource: StepResource);

    /// Request a full stop of the run loop.
    fn cancel(&self);

    /// Request a stop of the in-flight subtask only; the run loop keeps going.
    fn cancel_running_subtask(&self);

    /// Release local resources. Not called when `init` failed.
    async fn close(&self);

    /// Whether an `init` failure may succeed on a later attempt.
    fn is_retryable_error(&self, err: &anyhow::Error) -> bool;

    /// Snapshot of the task this executor was built for.
    fn task(&self) -> &Task;
}

/// Everything a factory may hand to the executor it builds.
#[derive(Clone)]
pub struct BuildContext {
    pub exec_id: ExecId,
    /// Shared manager context; canceled on shutdown.
    pub ctx: CancellationToken,
    pub table: Arc<dyn TaskTable>,
}

/// Constructor of executors for one task type.
pub trait ExecutorFactory: Send + Sync {
    fn build(&self, ctx: &BuildContext, task: Task) -> Arc<dyn TaskExecutor>;
}

impl<F> ExecutorFactory for F
where
    F: Fn(&BuildContext, Task) -> Arc<dyn TaskExecutor> + Send + Sync,
{
    fn build(&self, ctx: &BuildContext, task: Task) -> Arc<dyn TaskExecutor> {
        self(ctx, task)
    }
}

use std::sync::Arc;

use dxf_model::{Slots, TaskType};

/// Why an executor could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartFailure {
    UnknownType,
    InitRetryable,
    InitFatal,
}

impl StartFailure {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StartFailure::UnknownType => "unknown_type",
            StartFailure::InitRetryable => "init_retryable",
            StartFailure::InitFatal => "init_fatal",
        }
    }
}

/// Sink for the manager's operational metrics.
pub trait MetricsBackend: Send + Sync {
    fn executor_started(&self, task_type: &TaskType);
    fn executor_exited(&self, task_type: &TaskType);
    fn available_slots(&self, slots: Slots);
    fn preempted(&self, evicted: usize);
    fn start_failed(&self, task_type: &TaskType, reason: StartFailure);
    fn meta_recover_failed(&self);
}

pub type MetricsHandle = Arc<dyn MetricsBackend>;

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsBackend for NoopMetrics {
    fn executor_started(&self, _task_type: &TaskType) {}
    fn executor_exited(&self, _task_type: &TaskType) {}
    fn available_slots(&self, _slots: Slots) {}
    fn preempted(&self, _evicted: usize) {}
    fn start_failed(&self, _task_type: &TaskType, _reason: StartFailure) {}
    fn meta_recover_failed(&self) {}
}

pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoopMetrics)
}

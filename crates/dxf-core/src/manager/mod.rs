//! Node-local executor manager.
//!
//! The manager polls the task registry for tasks assigned to this node, starts
//! one executor per admitted task, evicts lower-ranked executors when a more
//! important task needs their slots, and keeps the node identity record alive.
//!
//! ## Shutdown order
//! [`Manager::stop`] cancels the shared context, waits for every executor to
//! exit (and be cleaned up), then waits for both periodic loops.
mod lifecycle;
mod reconcile;

use std::{
    collections::HashMap,
    sync::{
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use dxf_model::{ExecId, Slots, TaskId};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{Instrument, info};

use crate::{
    config::ManagerConfig,
    error::CoreError,
    executor::{ExecutorRegistry, TaskExecutor},
    metrics::{MetricsHandle, noop_metrics},
    retry::Retry,
    slot::SlotManager,
    system::HostCapacity,
    table::TaskTable,
};

/// Monitors the task registry and manages the executors of this node.
#[derive(Clone)]
pub struct Manager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    /// Same as the server identity, i.e. `host:port`.
    id: ExecId,
    table: Arc<dyn TaskTable>,
    registry: ExecutorRegistry,
    config: ManagerConfig,
    capacity: HostCapacity,
    metrics: MetricsHandle,
    ctx: CancellationToken,
    live: RwLock<LiveState>,
    loops: TaskTracker,
    executors: TaskTracker,
    started: AtomicBool,
}

/// Everything guarded by the manager lock.
struct LiveState {
    executors: HashMap<TaskId, Arc<dyn TaskExecutor>>,
    slots: SlotManager,
}

/// Builder for [`Manager`].
pub struct ManagerBuilder {
    id: ExecId,
    table: Arc<dyn TaskTable>,
    registry: ExecutorRegistry,
    config: ManagerConfig,
    capacity: Option<HostCapacity>,
    metrics: MetricsHandle,
}

impl ManagerBuilder {
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn executors(mut self, registry: ExecutorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Use a fixed capacity instead of discovering the host.
    pub fn capacity(mut self, capacity: HostCapacity) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Build the manager under a child of `parent`.
    ///
    /// No background work is started here; see [`Manager::start`].
    pub fn build(self, parent: &CancellationToken) -> Result<Manager, CoreError> {
        let capacity = match self.capacity {
            Some(capacity) => capacity,
            None => HostCapacity::discover()?,
        };
        info!(
            exec_id = %self.id,
            total_cpu = capacity.cpu,
            total_mem = capacity.mem_bytes,
            "build task executor manager"
        );
        self.metrics.available_slots(capacity.cpu);

        let inner = ManagerInner {
            id: self.id,
            table: self.table,
            registry: self.registry,
            config: self.config,
            capacity,
            metrics: self.metrics,
            ctx: parent.child_token(),
            live: RwLock::new(LiveState {
                executors: HashMap::new(),
                slots: SlotManager::new(capacity.cpu),
            }),
            loops: TaskTracker::new(),
            executors: TaskTracker::new(),
            started: AtomicBool::new(false),
        };
        Ok(Manager {
            inner: Arc::new(inner),
        })
    }
}

impl Manager {
    pub fn builder(id: impl Into<ExecId>, table: Arc<dyn TaskTable>) -> ManagerBuilder {
        ManagerBuilder {
            id: id.into(),
            table,
            registry: ExecutorRegistry::new(),
            config: ManagerConfig::default(),
            capacity: None,
            metrics: noop_metrics(),
        }
    }

    /// Create a manager sized to the current host.
    ///
    /// Fails if the host CPU or memory cannot be discovered.
    pub fn new(
        parent: &CancellationToken,
        id: impl Into<ExecId>,
        table: Arc<dyn TaskTable>,
        registry: ExecutorRegistry,
    ) -> Result<Self, CoreError> {
        Self::builder(id, table).executors(registry).build(parent)
    }

    /// Register this node in the registry.
    ///
    /// Not required before [`Manager::start`]: the recovery loop re-asserts
    /// the record periodically anyway.
    pub async fn init_meta(&self) -> Result<(), CoreError> {
        let inner = &self.inner;
        let mut retry = Retry::new(inner.config.retry_policy());
        retry
            .run(&inner.ctx, "init meta", || {
                inner.table.init_meta(&inner.id, &inner.config.scope)
            })
            .await
            .map_err(CoreError::from)
    }

    /// Launch the reconciliation and meta recovery loops and return.
    pub fn start(&self) -> Result<(), CoreError> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(CoreError::AlreadyStarted);
        }
        info!(exec_id = %self.inner.id, "task executor manager start");
        // Loops and executors log under the caller's span.
        self.inner.loops.spawn(self.clone().handle_tasks_loop().in_current_span());
        self.inner.loops.spawn(self.clone().recover_meta_loop().in_current_span());
        Ok(())
    }

    /// Cancel the shared context without waiting.
    ///
    /// Simulates abrupt loss of this node in tests.
    pub fn cancel(&self) {
        self.inner.ctx.cancel();
    }

    /// Cancel everything, then wait for executors and finally for the loops.
    pub async fn stop(&self) {
        let inner = &self.inner;
        inner.ctx.cancel();
        // Executors register under the write lock after checking the context,
        // so nothing can be spawned once this barrier is passed.
        drop(self.write_live());

        inner.executors.close();
        inner.executors.wait().await;
        inner.loops.close();
        inner.loops.wait().await;
        info!(exec_id = %inner.id, "task executor manager stopped");
    }

    #[inline]
    pub fn exec_id(&self) -> &str {
        &self.inner.id
    }

    #[inline]
    pub fn capacity(&self) -> HostCapacity {
        self.inner.capacity
    }

    pub fn is_executor_started(&self, task_id: TaskId) -> bool {
        self.read_live().executors.contains_key(&task_id)
    }

    /// Ids of the tasks with a live executor, sorted.
    pub fn running_tasks(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.read_live().executors.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn available_slots(&self) -> Slots {
        self.read_live().slots.available_slots()
    }

    fn read_live(&self) -> RwLockReadGuard<'_, LiveState> {
        self.inner.live.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_live(&self) -> RwLockWriteGuard<'_, LiveState> {
        self.inner.live.write().unwrap_or_else(PoisonError::into_inner)
    }
}

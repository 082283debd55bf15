//! Scripted executors and registries for driving a real manager in tests.
#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use dxf_core::{
    BuildContext, ExecutorFactory, ExecutorRegistry, HostCapacity, Manager, ManagerConfig,
    MemoryTaskTable, TableError, TaskExecutor, TaskTable,
};
use dxf_model::{StepResource, SubtaskState, Task, TaskId};
use tokio::sync::Barrier;
use tokio_util::sync::CancellationToken;

pub const NODE: &str = "node-a:4000";
pub const GIB: u64 = 1 << 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Init,
    Run,
    Cancel,
    CancelSubtask,
    Close,
}

/// Every lifecycle call made on any mock executor.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<(TaskId, Event)>>,
    resources: Mutex<HashMap<TaskId, StepResource>>,
}

impl Recorder {
    fn push(&self, id: TaskId, event: Event) {
        self.events.lock().unwrap().push((id, event));
    }

    pub fn count(&self, id: i64, event: Event) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, e)| t.get() == id && *e == event)
            .count()
    }

    pub fn resource(&self, id: i64) -> Option<StepResource> {
        self.resources.lock().unwrap().get(&TaskId::new(id)).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    Ok,
    Retryable,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Claim one subtask, then run until canceled.
    UntilCanceled,
    /// Claim one subtask, finish it and return.
    Complete,
    Panic,
}

pub struct MockFactory {
    pub table: MemoryTaskTable,
    pub recorder: Arc<Recorder>,
    pub init: InitMode,
    pub run: RunMode,
    /// Held in `init` until every party of the barrier got there.
    pub gate: Option<Arc<Barrier>>,
}

impl ExecutorFactory for MockFactory {
    fn build(&self, ctx: &BuildContext, task: Task) -> Arc<dyn TaskExecutor> {
        Arc::new(MockExecutor {
            exec_id: ctx.exec_id.clone(),
            cancel: ctx.ctx.child_token(),
            table: self.table.clone(),
            recorder: Arc::clone(&self.recorder),
            init: self.init,
            run: self.run,
            gate: self.gate.clone(),
            current: Mutex::new(None),
            task,
        })
    }
}

pub struct MockExecutor {
    task: Task,
    exec_id: String,
    cancel: CancellationToken,
    table: MemoryTaskTable,
    recorder: Arc<Recorder>,
    init: InitMode,
    run: RunMode,
    gate: Option<Arc<Barrier>>,
    current: Mutex<Option<i64>>,
}

#[async_trait]
impl TaskExecutor for MockExecutor {
    async fn init(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        self.recorder.push(self.task.id, Event::Init);
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        match self.init {
            InitMode::Ok => Ok(()),
            InitMode::Retryable => Err(anyhow::anyhow!("transient: region not ready")),
            InitMode::Fatal => Err(anyhow::anyhow!("bad task meta")),
        }
    }

    async fn run(&self, resource: StepResource) {
        self.recorder.push(self.task.id, Event::Run);
        self.recorder
            .resources
            .lock()
            .unwrap()
            .insert(self.task.id, resource);

        let claimed = self.table.start_next_subtask(&self.exec_id, self.task.id);
        *self.current.lock().unwrap() = claimed.as_ref().map(|s| s.id);

        match self.run {
            RunMode::UntilCanceled => self.cancel.cancelled().await,
            RunMode::Complete => {
                if let Some(subtask) = claimed {
                    self.table
                        .update_subtask_state(subtask.id, SubtaskState::Succeeded);
                }
            }
            RunMode::Panic => panic!("executor blew up"),
        }
    }

    fn cancel(&self) {
        self.recorder.push(self.task.id, Event::Cancel);
        self.cancel.cancel();
    }

    fn cancel_running_subtask(&self) {
        self.recorder.push(self.task.id, Event::CancelSubtask);
        if let Some(id) = self.current.lock().unwrap().take() {
            self.table.update_subtask_state(id, SubtaskState::Canceled);
        }
    }

    async fn close(&self) {
        self.recorder.push(self.task.id, Event::Close);
    }

    fn is_retryable_error(&self, err: &anyhow::Error) -> bool {
        err.to_string().starts_with("transient")
    }

    fn task(&self) -> &Task {
        &self.task
    }
}

pub struct Harness {
    pub table: MemoryTaskTable,
    pub recorder: Arc<Recorder>,
    pub manager: Manager,
    pub root: CancellationToken,
}

impl Harness {
    /// Manager with `cpu` slots and one mock task type per mode.
    pub fn new(cpu: usize) -> Self {
        Self::with_config(cpu, ManagerConfig::default())
    }

    pub fn with_config(cpu: usize, config: ManagerConfig) -> Self {
        let table = MemoryTaskTable::new();
        let recorder = Arc::new(Recorder::default());
        let gate = Arc::new(Barrier::new(2));
        let factory = |init, run| -> Arc<dyn ExecutorFactory> {
            Arc::new(MockFactory {
                table: table.clone(),
                recorder: Arc::clone(&recorder),
                init,
                run,
                gate: None,
            })
        };
        let registry = ExecutorRegistry::new()
            .with("long", factory(InitMode::Ok, RunMode::UntilCanceled))
            .with("short", factory(InitMode::Ok, RunMode::Complete))
            .with("panicky", factory(InitMode::Ok, RunMode::Panic))
            .with("flaky-init", factory(InitMode::Retryable, RunMode::UntilCanceled))
            .with("broken-init", factory(InitMode::Fatal, RunMode::UntilCanceled))
            .with(
                "gated",
                Arc::new(MockFactory {
                    table: table.clone(),
                    recorder: Arc::clone(&recorder),
                    init: InitMode::Ok,
                    run: RunMode::UntilCanceled,
                    gate: Some(gate),
                }),
            );

        let root = CancellationToken::new();
        let manager = Manager::builder(NODE, Arc::new(table.clone()))
            .config(config)
            .executors(registry)
            .capacity(HostCapacity::new(cpu, cpu as u64 * GIB).unwrap())
            .build(&root)
            .unwrap();

        Self {
            table,
            recorder,
            manager,
            root,
        }
    }

    /// Register `task` with one pending subtask on this node.
    pub fn submit(&self, task: Task) -> i64 {
        let id = task.id;
        self.table.add_task(task);
        self.table.add_subtask(id, NODE)
    }
}

/// Poll `cond` until it holds or a few seconds passed.
pub async fn eventually<F>(what: &str, mut cond: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never held: {what}");
}

/// Await `fut` with a generous upper bound.
pub async fn bounded<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(10), fut)
        .await
        .expect("operation timed out")
}

/// Registry returning a fixed task list and recording what it is asked to do.
#[derive(Default)]
pub struct ScriptedTable {
    pub tasks: Mutex<Vec<Task>>,
    /// Served one per poll before falling back to `tasks`.
    pub rounds: Mutex<VecDeque<Vec<Task>>>,
    pub paused: Mutex<Vec<TaskId>>,
    pub failed: Mutex<Vec<(TaskId, String)>>,
}

#[async_trait]
impl TaskTable for ScriptedTable {
    async fn init_meta(&self, _exec_id: &str, _scope: &str) -> Result<(), TableError> {
        Ok(())
    }

    async fn recover_meta(&self, _exec_id: &str, _scope: &str) -> Result<(), TableError> {
        Ok(())
    }

    async fn get_task_exec_info_by_exec_id(&self, _exec_id: &str) -> Result<Vec<Task>, TableError> {
        if let Some(round) = self.rounds.lock().unwrap().pop_front() {
            return Ok(round);
        }
        Ok(self.tasks.lock().unwrap().clone())
    }

    async fn pause_subtasks(&self, _exec_id: &str, task_id: TaskId) -> Result<(), TableError> {
        // zero rows affected is fine
        self.paused.lock().unwrap().push(task_id);
        Ok(())
    }

    async fn fail_subtask(&self, _exec_id: &str, task_id: TaskId, error: &str) -> Result<(), TableError> {
        self.failed.lock().unwrap().push((task_id, error.to_string()));
        Ok(())
    }
}

/// Manager over `table` whose only task type is `gated`: `init` of two
/// executors has to overlap before either may finish.
pub fn gated_manager(table: Arc<dyn TaskTable>, cpu: usize) -> (Manager, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let registry = ExecutorRegistry::new().with(
        "gated",
        Arc::new(MockFactory {
            table: MemoryTaskTable::new(),
            recorder: Arc::clone(&recorder),
            init: InitMode::Ok,
            run: RunMode::UntilCanceled,
            gate: Some(Arc::new(Barrier::new(2))),
        }),
    );
    let manager = Manager::builder(NODE, table)
        .executors(registry)
        .capacity(HostCapacity::new(cpu, cpu as u64 * GIB).unwrap())
        .build(&CancellationToken::new())
        .unwrap();
    (manager, recorder)
}

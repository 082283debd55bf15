use std::{collections::HashMap, sync::Arc};

use dxf_model::{Task, TaskType};
use tracing::{instrument, trace};

use crate::{
    error::CoreError,
    executor::{BuildContext, ExecutorFactory, TaskExecutor},
};

/// Mapping from task type tag to the factory building its executors.
///
/// Populated once at process start by each task-type module.
#[derive(Default, Clone)]
pub struct ExecutorRegistry {
    factories: HashMap<TaskType, Arc<dyn ExecutorFactory>>,
}

impl ExecutorRegistry {
    #[inline]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register `factory` for `task_type`, replacing a previous one.
    pub fn register(&mut self, task_type: impl Into<TaskType>, factory: Arc<dyn ExecutorFactory>) {
        let task_type = task_type.into();
        trace!(%task_type, "executor factory registered");
        self.factories.insert(task_type, factory);
    }

    /// Builder-style [`ExecutorRegistry::register`].
    pub fn with(mut self, task_type: impl Into<TaskType>, factory: Arc<dyn ExecutorFactory>) -> Self {
        self.register(task_type, factory);
        self
    }

    pub fn pick(&self, task_type: &TaskType) -> Option<&Arc<dyn ExecutorFactory>> {
        self.factories.get(task_type)
    }

    #[inline]
    pub fn contains(&self, task_type: &TaskType) -> bool {
        self.factories.contains_key(task_type)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    #[instrument(level = "trace", skip(self, ctx, task), fields(task_id = %task.id, task_type = %task.task_type))]
    pub fn build(&self, ctx: &BuildContext, task: Task) -> Result<Arc<dyn TaskExecutor>, CoreError> {
        let factory = self
            .pick(&task.task_type)
            .ok_or_else(|| CoreError::UnknownTaskType(task.task_type.clone()))?;
        Ok(factory.build(ctx, task))
    }
}

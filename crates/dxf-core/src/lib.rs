//! Node-local control plane of the distributed task execution framework.
//!
//! A [`Manager`] runs on every execution node. It polls the [`TaskTable`] for
//! tasks assigned to the node, decides through the [`SlotManager`] which of
//! them may occupy the node's CPU slots, and drives one [`TaskExecutor`] per
//! admitted task until it exits.
pub mod config;
pub use config::{ManagerConfig, RetryPolicy};

pub mod error;
pub use error::{CoreError, TableError};

pub mod executor;
pub use executor::{BuildContext, ExecutorFactory, ExecutorRegistry, TaskExecutor};

pub mod manager;
pub use manager::{Manager, ManagerBuilder};

pub mod metrics;
pub use metrics::{MetricsBackend, MetricsHandle, NoopMetrics, StartFailure};

pub mod retry;
pub use retry::{Retry, RetryState};

pub mod slot;
pub use slot::{Admission, SlotManager};

pub mod system;
pub use system::{HostCapacity, default_exec_id};

pub mod table;
pub use table::{MemoryTaskTable, TableOp, TaskTable};

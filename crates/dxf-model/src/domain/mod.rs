mod task_id;
pub use task_id::TaskId;

mod task_type;
pub use task_type::TaskType;

mod task_state;
pub use task_state::{ParseStateError, TaskState};

mod subtask;
pub use subtask::{Subtask, SubtaskState};

mod task;
pub use task::Task;

mod resource;
pub use resource::StepResource;

/// Identity of an execution node (usually `host:port`).
pub type ExecId = String;

/// Number of abstract CPU capacity units.
pub type Slots = usize;

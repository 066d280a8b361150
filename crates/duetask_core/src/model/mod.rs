mod task;

pub use task::{CompletedTask, Task, TaskId};

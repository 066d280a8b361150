use time::{Date, OffsetDateTime};

pub type TaskId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub due_date: Date,
}

/// A task moved out of the pending list, kept until its retention window ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTask {
    pub task: Task,
    pub completed_at: OffsetDateTime,
}

impl CompletedTask {
    pub fn new(task: Task, completed_at: OffsetDateTime) -> Self {
        Self { task, completed_at }
    }

    pub fn id(&self) -> &str {
        &self.task.id
    }
}

use crate::model::{CompletedTask, Task};
use std::cmp::Ordering;
use time::{Date, Duration, OffsetDateTime};

pub const HIGH_PRIORITY_DAYS: i64 = 7;
pub const RETENTION_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    HighPriority,
    Normal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    pub high_priority: Vec<Task>,
    pub normal: Vec<Task>,
}

/// Whole days from `today` to `due_date`. Both sides are calendar dates, so the
/// time of day at which either was captured has no effect.
pub fn days_until_due(due_date: Date, today: Date) -> i64 {
    (due_date - today).whole_days()
}

pub fn priority_of(task: &Task, today: Date, threshold_days: i64) -> Priority {
    if days_until_due(task.due_date, today) <= threshold_days {
        Priority::HighPriority
    } else {
        Priority::Normal
    }
}

/// Partitions `tasks` without touching the input; each side is stably sorted by
/// days until due.
pub fn classify(tasks: &[Task], today: Date, threshold_days: i64) -> Classified {
    let mut classified = Classified::default();
    for task in sorted_by_due(tasks, today) {
        match priority_of(&task, today, threshold_days) {
            Priority::HighPriority => classified.high_priority.push(task),
            Priority::Normal => classified.normal.push(task),
        }
    }
    classified
}

pub fn sorted_by_due(tasks: &[Task], today: Date) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by_key(|task| days_until_due(task.due_date, today));
    sorted
}

/// Most recently completed first.
pub fn sorted_completed(completed: &[CompletedTask]) -> Vec<CompletedTask> {
    let mut sorted = completed.to_vec();
    sorted.sort_by(|left, right| right.completed_at.cmp(&left.completed_at));
    sorted
}

/// `ceil((now - completed_at) / 1 day) > retention_days`, compared in whole
/// days so any `retention_days` is accepted.
pub fn retention_expired(
    completed_at: OffsetDateTime,
    now: OffsetDateTime,
    retention_days: i64,
) -> bool {
    let elapsed = now - completed_at;
    let whole_days = elapsed.whole_days();
    match whole_days.cmp(&retention_days) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => elapsed > Duration::days(whole_days),
    }
}

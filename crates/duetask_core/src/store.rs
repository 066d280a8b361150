use crate::clock::Clock;
use crate::due::{self, Classified, HIGH_PRIORITY_DAYS, RETENTION_DAYS};
use crate::error::{AppError, StorageError, ValidationError};
use crate::model::{CompletedTask, Task, TaskId};
use crate::storage::{COMPLETED_KEY, PENDING_KEY, Persistence, record};
use std::sync::Arc;
use time::{Date, OffsetDateTime};
use tokio::sync::{Mutex, broadcast};

pub const MAX_TASK_LENGTH: usize = 50;
const EVENT_CAPACITY: usize = 64;

/// A store shared between a session and its cleanup scheduler. Holding the lock
/// across a save keeps at most one write per collection in flight.
pub type SharedStore<P> = Arc<Mutex<TaskStore<P>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorePolicy {
    pub max_task_length: usize,
    pub high_priority_days: i64,
    pub retention_days: i64,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self {
            max_task_length: MAX_TASK_LENGTH,
            high_priority_days: HIGH_PRIORITY_DAYS,
            retention_days: RETENTION_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    TaskAdded(TaskId),
    TaskCompleted(TaskId),
    TaskRemoved { id: TaskId, from_completed: bool },
    CompletedPurged(usize),
    PersistFailed(StorageError),
}

/// Result of a mutation that was applied in memory. `failures` lists the saves
/// that did not go through; the in-memory change is kept regardless.
#[derive(Debug, Clone)]
pub struct MutationOutcome<T> {
    pub value: T,
    pub failures: Vec<StorageError>,
}

impl<T> MutationOutcome<T> {
    pub fn is_persisted(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Collection {
    Pending,
    Completed,
}

pub struct TaskStore<P> {
    persistence: P,
    clock: Arc<dyn Clock>,
    policy: StorePolicy,
    pending: Vec<Task>,
    completed: Vec<CompletedTask>,
    load_errors: Vec<StorageError>,
    events: broadcast::Sender<StoreEvent>,
}

pub fn validate_text(text: &str, max_len: usize) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    if trimmed.chars().count() > max_len {
        return Err(ValidationError::TooLong { max: max_len });
    }
    Ok(trimmed.to_string())
}

impl<P: Persistence> TaskStore<P> {
    /// Loads both collections. A collection that cannot be read or parsed starts
    /// empty and its error is kept for [`TaskStore::take_load_errors`].
    pub async fn open(persistence: P, clock: Arc<dyn Clock>, policy: StorePolicy) -> Self {
        let now = clock.now();
        let mut load_errors = Vec::new();

        let pending = match load_pending(&persistence, now).await {
            Ok(tasks) => tasks,
            Err(err) => {
                log::info!("starting with no pending tasks: {err}");
                load_errors.push(err);
                Vec::new()
            }
        };
        let completed = match load_completed(&persistence, now).await {
            Ok(tasks) => tasks,
            Err(err) => {
                log::info!("starting with no completed tasks: {err}");
                load_errors.push(err);
                Vec::new()
            }
        };
        log::debug!(
            "opened store with {} pending and {} completed tasks",
            pending.len(),
            completed.len()
        );

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            persistence,
            clock,
            policy,
            pending,
            completed,
            load_errors,
            events,
        }
    }

    pub fn into_shared(self) -> SharedStore<P> {
        Arc::new(Mutex::new(self))
    }

    pub fn policy(&self) -> StorePolicy {
        self.policy
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    pub fn today(&self) -> Date {
        self.clock.today()
    }

    /// Load failures from [`TaskStore::open`]; returned once, then cleared.
    pub fn take_load_errors(&mut self) -> Vec<StorageError> {
        std::mem::take(&mut self.load_errors)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Pending tasks in insertion order.
    pub fn pending(&self) -> &[Task] {
        &self.pending
    }

    /// Completed tasks, most recently completed first.
    pub fn completed(&self) -> Vec<CompletedTask> {
        due::sorted_completed(&self.completed)
    }

    pub fn days_until_due(&self, due_date: Date) -> i64 {
        due::days_until_due(due_date, self.today())
    }

    pub fn classify(&self) -> Classified {
        due::classify(&self.pending, self.today(), self.policy.high_priority_days)
    }

    pub async fn add_task(
        &mut self,
        text: &str,
        due_date: Date,
    ) -> Result<MutationOutcome<Task>, AppError> {
        let text = validate_text(text, self.policy.max_task_length)?;
        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            text,
            due_date,
        };

        self.pending.push(task.clone());
        log::debug!("added task {} due {}", task.id, task.due_date);
        self.emit(StoreEvent::TaskAdded(task.id.clone()));

        let failures = self.persist(&[Collection::Pending]).await;
        Ok(MutationOutcome {
            value: task,
            failures,
        })
    }

    pub async fn complete_task(
        &mut self,
        id: &str,
    ) -> Result<MutationOutcome<CompletedTask>, AppError> {
        let trimmed_id = id.trim();
        let index = self
            .pending
            .iter()
            .position(|task| task.id == trimmed_id)
            .ok_or_else(|| AppError::not_found(trimmed_id))?;

        let task = self.pending.remove(index);
        let completed = CompletedTask::new(task, self.clock.now());
        self.completed.push(completed.clone());
        log::debug!("completed task {}", completed.id());
        self.emit(StoreEvent::TaskCompleted(completed.task.id.clone()));

        let failures = self
            .persist(&[Collection::Pending, Collection::Completed])
            .await;
        Ok(MutationOutcome {
            value: completed,
            failures,
        })
    }

    pub async fn remove_task(
        &mut self,
        id: &str,
        from_completed: bool,
    ) -> Result<MutationOutcome<Task>, AppError> {
        let trimmed_id = id.trim();
        let (removed, collection) = if from_completed {
            let index = self
                .completed
                .iter()
                .position(|entry| entry.id() == trimmed_id)
                .ok_or_else(|| AppError::not_found(trimmed_id))?;
            (self.completed.remove(index).task, Collection::Completed)
        } else {
            let index = self
                .pending
                .iter()
                .position(|task| task.id == trimmed_id)
                .ok_or_else(|| AppError::not_found(trimmed_id))?;
            (self.pending.remove(index), Collection::Pending)
        };

        log::debug!("removed task {}", removed.id);
        self.emit(StoreEvent::TaskRemoved {
            id: removed.id.clone(),
            from_completed,
        });

        let failures = self.persist(&[collection]).await;
        Ok(MutationOutcome {
            value: removed,
            failures,
        })
    }

    /// Drops completed tasks older than the retention window as of `now`.
    /// Nothing is written when nothing expired.
    pub async fn cleanup_completed(&mut self, now: OffsetDateTime) -> MutationOutcome<usize> {
        let retention_days = self.policy.retention_days;
        let before = self.completed.len();
        self.completed
            .retain(|entry| !due::retention_expired(entry.completed_at, now, retention_days));
        let removed = before - self.completed.len();

        if removed == 0 {
            return MutationOutcome {
                value: 0,
                failures: Vec::new(),
            };
        }

        log::info!("purged {removed} completed tasks older than {retention_days} days");
        self.emit(StoreEvent::CompletedPurged(removed));
        let failures = self.persist(&[Collection::Completed]).await;
        MutationOutcome {
            value: removed,
            failures,
        }
    }

    async fn persist(&self, collections: &[Collection]) -> Vec<StorageError> {
        let mut failures = Vec::new();
        for collection in collections {
            if let Err(err) = self.save(*collection).await {
                log::info!("keeping unsaved changes in memory: {err}");
                self.emit(StoreEvent::PersistFailed(err.clone()));
                failures.push(err);
            }
        }
        failures
    }

    async fn save(&self, collection: Collection) -> Result<(), StorageError> {
        match collection {
            Collection::Pending => {
                let blob = record::encode_pending(PENDING_KEY, &self.pending)?;
                self.persistence.save(PENDING_KEY, &blob).await
            }
            Collection::Completed => {
                let blob = record::encode_completed(COMPLETED_KEY, &self.completed)?;
                self.persistence.save(COMPLETED_KEY, &blob).await
            }
        }
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

async fn load_pending<P: Persistence>(
    persistence: &P,
    now: OffsetDateTime,
) -> Result<Vec<Task>, StorageError> {
    match persistence.load(PENDING_KEY).await? {
        Some(blob) => record::decode_pending(PENDING_KEY, &blob, now),
        None => Ok(Vec::new()),
    }
}

async fn load_completed<P: Persistence>(
    persistence: &P,
    now: OffsetDateTime,
) -> Result<Vec<CompletedTask>, StorageError> {
    match persistence.load(COMPLETED_KEY).await? {
        Some(blob) => record::decode_completed(COMPLETED_KEY, &blob, now),
        None => Ok(Vec::new()),
    }
}

//! JSON shape of the stored collections.
//!
//! Each key holds an array of task records. Dates are written as ISO strings and
//! re-parsed on load; a bad `dueDate` or `completedAt` falls back to the
//! current time instead of failing the whole collection.

use crate::error::StorageError;
use crate::model::{CompletedTask, Task};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    #[serde(alias = "key")]
    id: String,
    #[serde(alias = "value")]
    text: String,
    #[serde(default)]
    due_date: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletedRecord {
    #[serde(flatten)]
    task: TaskRecord,
    #[serde(default)]
    completed_at: Option<Value>,
}

pub fn format_iso_date(date: Date) -> Result<String, time::error::Format> {
    date.format(format_description!("[year]-[month]-[day]"))
}

pub fn parse_iso_date(value: &str) -> Result<Date, time::error::Parse> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]"))
}

pub fn encode_pending(key: &str, tasks: &[Task]) -> Result<String, StorageError> {
    let records = tasks
        .iter()
        .map(|task| task_record(key, task))
        .collect::<Result<Vec<_>, _>>()?;
    serde_json::to_string_pretty(&records)
        .map_err(|err| StorageError::write_failed(key, err.to_string()))
}

pub fn encode_completed(key: &str, completed: &[CompletedTask]) -> Result<String, StorageError> {
    let mut records = Vec::with_capacity(completed.len());
    for entry in completed {
        let completed_at = entry
            .completed_at
            .format(&Rfc3339)
            .map_err(|err| StorageError::write_failed(key, err.to_string()))?;
        records.push(CompletedRecord {
            task: task_record(key, &entry.task)?,
            completed_at: Some(Value::String(completed_at)),
        });
    }
    serde_json::to_string_pretty(&records)
        .map_err(|err| StorageError::write_failed(key, err.to_string()))
}

pub fn decode_pending(
    key: &str,
    blob: &str,
    now: OffsetDateTime,
) -> Result<Vec<Task>, StorageError> {
    let records: Vec<TaskRecord> = serde_json::from_str(blob)
        .map_err(|err| StorageError::parse_failed(key, err.to_string()))?;
    Ok(records
        .into_iter()
        .map(|record| task_from_record(record, now))
        .collect())
}

pub fn decode_completed(
    key: &str,
    blob: &str,
    now: OffsetDateTime,
) -> Result<Vec<CompletedTask>, StorageError> {
    let records: Vec<CompletedRecord> = serde_json::from_str(blob)
        .map_err(|err| StorageError::parse_failed(key, err.to_string()))?;
    Ok(records
        .into_iter()
        .map(|record| {
            let completed_at =
                parse_completed_at(&record.task.id, record.completed_at.as_ref(), now);
            CompletedTask::new(task_from_record(record.task, now), completed_at)
        })
        .collect())
}

fn task_record(key: &str, task: &Task) -> Result<TaskRecord, StorageError> {
    let due_date = format_iso_date(task.due_date)
        .map_err(|err| StorageError::write_failed(key, err.to_string()))?;
    Ok(TaskRecord {
        id: task.id.clone(),
        text: task.text.clone(),
        due_date: Some(Value::String(due_date)),
    })
}

fn task_from_record(record: TaskRecord, now: OffsetDateTime) -> Task {
    let due_date = parse_due_date(&record.id, record.due_date.as_ref(), now);
    Task {
        id: record.id,
        text: record.text,
        due_date,
    }
}

fn parse_due_date(id: &str, value: Option<&Value>, now: OffsetDateTime) -> Date {
    let raw = match value {
        Some(Value::String(raw)) => raw,
        Some(other) => {
            log::warn!("task {id}: dueDate {other} is not a string, using today");
            return now.date();
        }
        None => {
            log::warn!("task {id}: dueDate missing, using today");
            return now.date();
        }
    };

    if let Ok(date) = parse_iso_date(raw) {
        return date;
    }

    // Older saves carried a full timestamp; keep its local calendar day.
    match OffsetDateTime::parse(raw.trim(), &Rfc3339) {
        Ok(timestamp) => timestamp.to_offset(now.offset()).date(),
        Err(_) => {
            log::warn!("task {id}: dueDate '{raw}' is not an ISO date, using today");
            now.date()
        }
    }
}

fn parse_completed_at(id: &str, value: Option<&Value>, now: OffsetDateTime) -> OffsetDateTime {
    match value {
        Some(Value::String(raw)) => match OffsetDateTime::parse(raw.trim(), &Rfc3339) {
            Ok(timestamp) => timestamp,
            Err(_) => {
                log::warn!("task {id}: completedAt '{raw}' is not RFC 3339, using now");
                now
            }
        },
        _ => {
            log::warn!("task {id}: completedAt missing, using now");
            now
        }
    }
}

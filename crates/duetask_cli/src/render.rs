use crate::cli::ListCommand;
use duetask_core::config::Theme;
use duetask_core::display::{DateStyle, days_left_label};
use duetask_core::due::{Classified, days_until_due};
use duetask_core::error::AppError;
use duetask_core::model::{CompletedTask, Task};
use serde_json::{Value, json};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::format_description::well_known::Rfc3339;
use time::{Date, UtcOffset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    HighPriority,
    Normal,
    Completed,
}

impl Section {
    pub fn title(self) -> &'static str {
        match self {
            Self::HighPriority => "High Priority Tasks",
            Self::Normal => "Normal Tasks",
            Self::Completed => "Completed Tasks",
        }
    }

    fn json_key(self) -> &'static str {
        match self {
            Self::HighPriority => "high_priority",
            Self::Normal => "normal",
            Self::Completed => "completed",
        }
    }
}

pub fn sections_for(list: Option<ListCommand>) -> &'static [Section] {
    match list {
        None | Some(ListCommand::All) => {
            &[Section::HighPriority, Section::Normal, Section::Completed]
        }
        Some(ListCommand::High) => &[Section::HighPriority],
        Some(ListCommand::Normal) => &[Section::Normal],
        Some(ListCommand::Completed) => &[Section::Completed],
    }
}

/// Everything `list` shows, captured under one store lock.
#[derive(Debug, Clone)]
pub struct ListView {
    pub today: Date,
    pub offset: UtcOffset,
    pub classified: Classified,
    pub completed: Vec<CompletedTask>,
}

#[derive(Tabled)]
struct PendingRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Task")]
    text: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Days left")]
    days_left: String,
}

#[derive(Tabled)]
struct CompletedRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Task")]
    text: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Completed")]
    completed_at: String,
}

fn pending_table(tasks: &[Task], today: Date, style: &DateStyle) -> String {
    let rows = tasks.iter().map(|task| PendingRow {
        id: task.id.clone(),
        text: task.text.clone(),
        due: style.format_date(task.due_date),
        days_left: days_left_label(days_until_due(task.due_date, today)),
    });
    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}

fn completed_table(entries: &[CompletedTask], offset: UtcOffset, style: &DateStyle) -> String {
    let rows = entries.iter().map(|entry| CompletedRow {
        id: entry.task.id.clone(),
        text: entry.task.text.clone(),
        due: style.format_date(entry.task.due_date),
        completed_at: style.format_timestamp(entry.completed_at, offset),
    });
    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}

/// Renders the requested sections as tables. Empty sections are left out.
pub fn render_sections(
    view: &ListView,
    sections: &[Section],
    style: &DateStyle,
    theme: Theme,
) -> String {
    let mut blocks = Vec::new();
    for section in sections {
        let (heading, table) = match section {
            Section::HighPriority if !view.classified.high_priority.is_empty() => (
                theme.high_priority(section.title()),
                pending_table(&view.classified.high_priority, view.today, style),
            ),
            Section::Normal if !view.classified.normal.is_empty() => (
                section.title().to_string(),
                pending_table(&view.classified.normal, view.today, style),
            ),
            Section::Completed if !view.completed.is_empty() => (
                theme.completed(section.title()),
                completed_table(&view.completed, view.offset, style),
            ),
            _ => continue,
        };
        blocks.push(format!("{heading}\n{table}"));
    }

    if blocks.is_empty() {
        return "No tasks.".to_string();
    }
    blocks.join("\n\n")
}

pub fn task_json(task: &Task, today: Date, style: &DateStyle) -> Value {
    json!({
        "id": task.id,
        "text": task.text,
        "due_date": task.due_date.to_string(),
        "due_date_display": style.format_date(task.due_date),
        "days_until_due": days_until_due(task.due_date, today),
    })
}

pub fn completed_json(
    entry: &CompletedTask,
    offset: UtcOffset,
    style: &DateStyle,
) -> Result<Value, AppError> {
    let completed_at = entry
        .completed_at
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    Ok(json!({
        "id": entry.task.id,
        "text": entry.task.text,
        "due_date": entry.task.due_date.to_string(),
        "due_date_display": style.format_date(entry.task.due_date),
        "completed_at": completed_at,
        "completed_at_display": style.format_timestamp(entry.completed_at, offset),
    }))
}

/// JSON object keyed by section. Requested sections are present even when
/// empty.
pub fn sections_json(
    view: &ListView,
    sections: &[Section],
    style: &DateStyle,
) -> Result<Value, AppError> {
    let mut payload = serde_json::Map::new();
    for section in sections {
        let items = match section {
            Section::HighPriority => view
                .classified
                .high_priority
                .iter()
                .map(|task| task_json(task, view.today, style))
                .collect(),
            Section::Normal => view
                .classified
                .normal
                .iter()
                .map(|task| task_json(task, view.today, style))
                .collect(),
            Section::Completed => view
                .completed
                .iter()
                .map(|entry| completed_json(entry, view.offset, style))
                .collect::<Result<Vec<_>, _>>()?,
        };
        payload.insert(section.json_key().to_string(), Value::Array(items));
    }
    Ok(Value::Object(payload))
}

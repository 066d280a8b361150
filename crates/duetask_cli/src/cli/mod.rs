use clap::{Parser, Subcommand};
use duetask_core::config::{ConfigOverrides, canonicalize_name};
use duetask_core::error::AppError;
use duetask_core::storage::record::parse_iso_date;
use time::{Date, Duration};

#[derive(Parser, Debug)]
#[command(author, version, about = "Due-date driven to-do list", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task (due today unless --due or --in-days is given)
    ///
    /// Example: duetask add "Buy milk" --in-days 3
    /// Example: duetask add "Renew passport" --due 2026-11-28
    Add {
        text: Option<String>,
        /// Due date as YYYY-MM-DD
        #[arg(long, value_name = "YYYY-MM-DD", conflicts_with = "in_days")]
        due: Option<String>,
        /// Due this many days from today
        #[arg(long = "in-days", value_name = "DAYS")]
        in_days: Option<u32>,
    },
    /// Mark a task as done
    ///
    /// Example: duetask done 6f1c...
    Done { id: String },
    /// Delete a task
    ///
    /// Example: duetask remove 6f1c...
    /// Example: duetask remove 6f1c... --completed
    Remove {
        id: String,
        /// Remove from the completed list instead of the pending one
        #[arg(long)]
        completed: bool,
    },
    /// List tasks by section
    ///
    /// Example: duetask list
    /// Example: duetask list high
    List {
        #[command(subcommand)]
        list: Option<ListCommand>,
    },
    /// Purge completed tasks past the retention window now
    ///
    /// Example: duetask cleanup
    Cleanup,
    /// Start an interactive session (also the default with no arguments)
    ///
    /// Example: duetask --config-override theme=noir shell
    Shell,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListCommand {
    /// All sections
    All,
    /// Pending tasks due within the high priority window
    High,
    /// Pending tasks due later
    Normal,
    /// Completed tasks, latest first
    Completed,
}

/// Works out the due date for `add`. Dates before `today` are rejected, the
/// way a date picker would not offer them.
pub fn resolve_due_date(
    due: Option<&str>,
    in_days: Option<u32>,
    today: Date,
) -> Result<Date, AppError> {
    let due_date = match (due, in_days) {
        (Some(raw), _) => parse_iso_date(raw)
            .map_err(|_| AppError::invalid_input("due date must be YYYY-MM-DD"))?,
        (None, Some(days)) => today
            .checked_add(Duration::days(i64::from(days)))
            .ok_or_else(|| AppError::invalid_input("due date is out of range"))?,
        (None, None) => today,
    };

    if due_date < today {
        return Err(AppError::invalid_input("due date cannot be in the past"));
    }
    Ok(due_date)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    HighPriorityDays,
    RetentionDays,
    MaxTaskLength,
    CleanupIntervalHours,
    DateStyle,
    DesktopAlerts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let field = canonicalize_name(key_raw);
    if field.is_empty() {
        return Err("override key cannot be empty".to_string());
    }

    let target = match field.as_str() {
        "theme" => ConfigOverrideTarget::Theme,
        "high_priority_days" => ConfigOverrideTarget::HighPriorityDays,
        "retention_days" => ConfigOverrideTarget::RetentionDays,
        "max_task_length" => ConfigOverrideTarget::MaxTaskLength,
        "cleanup_interval_hours" => ConfigOverrideTarget::CleanupIntervalHours,
        "date_style" => ConfigOverrideTarget::DateStyle,
        "desktop_alerts" => ConfigOverrideTarget::DesktopAlerts,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride {
        target,
        value: value_raw.trim().to_string(),
    })
}

pub fn collect_config_overrides(raws: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for raw in raws {
        let parsed = parse_config_override(raw)?;
        let value = parsed.value;
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(value),
            ConfigOverrideTarget::HighPriorityDays => {
                overrides.high_priority_days = Some(parse_number(&value, "high_priority_days")?)
            }
            ConfigOverrideTarget::RetentionDays => {
                overrides.retention_days = Some(parse_number(&value, "retention_days")?)
            }
            ConfigOverrideTarget::MaxTaskLength => {
                overrides.max_task_length = Some(parse_number(&value, "max_task_length")?)
            }
            ConfigOverrideTarget::CleanupIntervalHours => {
                overrides.cleanup_interval_hours =
                    Some(parse_number(&value, "cleanup_interval_hours")?)
            }
            ConfigOverrideTarget::DateStyle => overrides.date_style = Some(value),
            ConfigOverrideTarget::DesktopAlerts => {
                overrides.desktop_alerts = Some(parse_flag(&value)?)
            }
        }
    }
    Ok(overrides)
}

fn parse_number<T: std::str::FromStr>(value: &str, field: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{field} expects a whole number, got '{value}'"))
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("desktop_alerts expects true or false, got '{value}'")),
    }
}

/// Splits an interactive command line into arguments, honouring double quotes
/// and backslash escapes inside them.
pub fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

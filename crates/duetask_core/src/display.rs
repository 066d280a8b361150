//! Display strings derived from task dates on every read. Nothing here is
//! persisted.

use crate::error::AppError;
use std::fmt;
use time::format_description::{self, OwnedFormatItem};
use time::{Date, OffsetDateTime, UtcOffset};

/// Years in the Thai solar calendar run 543 ahead of the Gregorian ones.
const BUDDHIST_ERA_OFFSET: i32 = 543;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DateStyle {
    Iso,
    #[default]
    Thai,
    Pattern(DatePattern),
}

/// A `time` format description such as `[day].[month].[year]`, parsed once.
#[derive(Clone)]
pub struct DatePattern {
    source: String,
    items: OwnedFormatItem,
}

impl DatePattern {
    pub fn parse(source: &str) -> Result<Self, AppError> {
        let items = format_description::parse_owned::<2>(source).map_err(|err| {
            AppError::invalid_data(format!("invalid date_style '{source}': {err}"))
        })?;
        Ok(Self {
            source: source.to_string(),
            items,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl PartialEq for DatePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for DatePattern {}

impl fmt::Debug for DatePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DatePattern").field(&self.source).finish()
    }
}

impl DateStyle {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "thai" | "th" | "th-th" => Ok(Self::Thai),
            "iso" | "iso8601" | "iso-8601" => Ok(Self::Iso),
            _ => Ok(Self::Pattern(DatePattern::parse(trimmed)?)),
        }
    }

    pub fn format_date(&self, date: Date) -> String {
        match self {
            Self::Iso => date.to_string(),
            Self::Thai => format!(
                "{}/{}/{}",
                date.day(),
                u8::from(date.month()),
                date.year() + BUDDHIST_ERA_OFFSET
            ),
            Self::Pattern(pattern) => date
                .format(&pattern.items)
                .unwrap_or_else(|_| date.to_string()),
        }
    }

    /// Formats the calendar day of `at` as seen from `offset`, followed by the
    /// time of day.
    pub fn format_timestamp(&self, at: OffsetDateTime, offset: UtcOffset) -> String {
        let local = at.to_offset(offset);
        format!(
            "{} {:02}:{:02}",
            self.format_date(local.date()),
            local.hour(),
            local.minute()
        )
    }
}

pub fn days_left_label(days: i64) -> String {
    match days {
        0 => "due today".to_string(),
        1 => "1 day left".to_string(),
        -1 => "overdue by 1 day".to_string(),
        n if n > 1 => format!("{n} days left"),
        n => format!("overdue by {} days", -n),
    }
}

#[cfg(test)]
mod tests {
    use super::{DatePattern, DateStyle, days_left_label};
    use time::UtcOffset;
    use time::macros::{date, datetime};

    #[test]
    fn thai_style_uses_buddhist_era() {
        assert_eq!(DateStyle::Thai.format_date(date!(2026-10-22)), "22/10/2569");
        assert_eq!(DateStyle::Thai.format_date(date!(2027-01-05)), "5/1/2570");
    }

    #[test]
    fn iso_and_pattern_styles() {
        assert_eq!(DateStyle::Iso.format_date(date!(2026-10-22)), "2026-10-22");

        let style = DateStyle::parse("[day].[month].[year]").unwrap();
        match &style {
            DateStyle::Pattern(pattern) => assert_eq!(pattern.source(), "[day].[month].[year]"),
            other => panic!("expected a pattern, got {other:?}"),
        }
        assert_eq!(style.format_date(date!(2026-10-22)), "22.10.2026");
        assert_eq!(
            DateStyle::parse("[year]/[month]").unwrap(),
            DateStyle::Pattern(DatePattern::parse("[year]/[month]").unwrap())
        );
    }

    #[test]
    fn parse_maps_names_and_rejects_bad_patterns() {
        assert_eq!(DateStyle::parse(" TH-th ").unwrap(), DateStyle::Thai);
        assert_eq!(DateStyle::parse("ISO").unwrap(), DateStyle::Iso);
        assert_eq!(DateStyle::parse("").unwrap(), DateStyle::Thai);

        let err = DateStyle::parse("[bogus]").unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn timestamp_uses_the_viewer_offset() {
        let at = datetime!(2026-10-18 20:30 UTC);
        let bangkok = UtcOffset::from_hms(7, 0, 0).unwrap();

        assert_eq!(DateStyle::Iso.format_timestamp(at, bangkok), "2026-10-19 03:30");
        assert_eq!(DateStyle::Thai.format_timestamp(at, UtcOffset::UTC), "18/10/2569 20:30");
    }

    #[test]
    fn days_left_labels() {
        assert_eq!(days_left_label(0), "due today");
        assert_eq!(days_left_label(1), "1 day left");
        assert_eq!(days_left_label(12), "12 days left");
        assert_eq!(days_left_label(-1), "overdue by 1 day");
        assert_eq!(days_left_label(-4), "overdue by 4 days");
    }
}

use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

pub const DATE_HELP: &str =
    "Examples are \"today\", \"yesterday\", \"2025-03-15\", \"15/03/2025\", \"last monday\"";

fn validation_error(message: String) -> anyhow::Error {
    Args::command()
        .error(clap::error::ErrorKind::ValueValidation, message)
        .into()
}

/// Accepts ISO dates as stored in the task list, then anything chrono-english understands.
pub fn parse_day(input: &str, style: DateStyle, now: DateTime<Local>) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d") {
        return Ok(date);
    }
    parse_date_string(input, now, style.into())
        .map(|v| v.with_timezone(&Local).date_naive())
        .map_err(|e| validation_error(format!("Failed to validate date \"{input}\" {e}")))
}

pub fn parse_optional_day(
    input: Option<&str>,
    style: DateStyle,
    now: DateTime<Local>,
) -> Result<Option<NaiveDate>> {
    input.map(|v| parse_day(v, style, now)).transpose()
}

/// `HH:MM` on `date`, in the local timezone.
pub fn parse_start_hour(input: &str, date: NaiveDate) -> Result<DateTime<Utc>> {
    let time = NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map_err(|e| validation_error(format!("Failed to validate start hour \"{input}\" {e}")))?;
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|v| v.with_timezone(&Utc))
        .ok_or_else(|| validation_error(format!("{input} doesn't exist on {date}")))
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate, TimeZone, Timelike};

    use super::*;

    #[test]
    fn test_parse_day() {
        let now = Local.with_ymd_and_hms(2025, 3, 16, 12, 0, 0).unwrap();
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();

        assert_eq!(parse_day("2025-03-01", DateStyle::Uk, now).unwrap(), date(2025, 3, 1));
        assert_eq!(parse_day("yesterday", DateStyle::Uk, now).unwrap(), date(2025, 3, 15));
        assert_eq!(parse_day("04/03/2025", DateStyle::Uk, now).unwrap(), date(2025, 3, 4));
        assert_eq!(parse_day("04/03/2025", DateStyle::Us, now).unwrap(), date(2025, 4, 3));
        assert!(parse_day("not a date", DateStyle::Uk, now).is_err());
        assert_eq!(parse_optional_day(None, DateStyle::Uk, now).unwrap(), None);
    }

    #[test]
    fn test_parse_start_hour() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let start = parse_start_hour("08:45", date).unwrap().with_timezone(&Local);
        assert_eq!(start.date_naive(), date);
        assert_eq!((start.hour(), start.minute()), (8, 45));
        assert!(parse_start_hour("25:00", date).is_err());
    }
}

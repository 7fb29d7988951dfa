use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// This is the standard way of converting a date to a string in dastime.
pub fn date_to_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Formats seconds as `HH:MM:SS`. Negative values are prefixed with `- `, hours are not
/// wrapped at 24.
pub fn format_seconds(seconds: i64) -> String {
    let sign = if seconds < 0 { "- " } else { "" };
    let seconds = seconds.unsigned_abs();
    format!(
        "{sign}{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Parses `HH:MM:SS`, `MM:SS` or plain seconds. Minutes and seconds are clamped to 0..=59 the
/// same way the edit form does it.
pub fn parse_hms(value: &str) -> Option<u64> {
    let parts = value
        .trim()
        .split(':')
        .map(|v| v.trim().parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [s] => Some(*s),
        [m, s] => Some(m.min(&59) * 60 + s.min(&59)),
        [h, m, s] => Some(h * 3600 + m.min(&59) * 60 + s.min(&59)),
        _ => None,
    }
}

/// Weeks start on Sunday.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).expect("First day always exists")
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    let next = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    next.and_then(|v| v.pred_opt())
        .expect("Month end should always exist")
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

const MONTHS_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

pub fn month_name_fr(month: u32) -> &'static str {
    MONTHS_FR[(month as usize + 11) % 12]
}

pub fn weekday_name_fr(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "lundi",
        Weekday::Tue => "mardi",
        Weekday::Wed => "mercredi",
        Weekday::Thu => "jeudi",
        Weekday::Fri => "vendredi",
        Weekday::Sat => "samedi",
        Weekday::Sun => "dimanche",
    }
}

/// `lun`, `mar`, ... as used in column headers.
pub fn weekday_short_fr(weekday: Weekday) -> &'static str {
    &weekday_name_fr(weekday)[..3]
}

/// `lundi 15 janvier 2024`
pub fn format_date_long_fr(date: NaiveDate) -> String {
    format!(
        "{} {} {} {}",
        weekday_name_fr(date.weekday()),
        date.day(),
        month_name_fr(date.month()),
        date.year()
    )
}

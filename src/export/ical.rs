use chrono::{DateTime, NaiveTime, TimeZone, Utc};

use crate::{
    store::entities::TaskEntity,
    utils::time::{date_to_key, format_seconds},
};

pub const PRODUCT_ID: &str = "-//Compteur de Temps//FR";

const LINE_END: &str = "\r\n";

/// Start used for tasks that were never started.
pub fn default_start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Tasks without a recorded first start begin at 09:00 in `tz` on their date.
pub fn event_start<Tz: TimeZone>(task: &TaskEntity, tz: &Tz) -> DateTime<Utc> {
    if let Some(start) = task.start_hour {
        return start;
    }
    let naive = task.date.and_time(default_start_time());
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|v| v.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

fn format_utc(time: DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Renders a calendar with one event per task, lines terminated by CRLF.
pub fn render<Tz: TimeZone>(tasks: &[TaskEntity], tz: &Tz) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".into(),
        format!("PRODID:{PRODUCT_ID}"),
        "CALSCALE:GREGORIAN".into(),
    ];

    for task in tasks {
        let start = event_start(task, tz);
        let end = start + chrono::Duration::seconds(task.elapsed_time as i64);
        let description = format!("Temps passé: {}", format_seconds(task.elapsed_time as i64));
        lines.extend([
            "BEGIN:VEVENT".to_string(),
            format!("DTSTART:{}", format_utc(start)),
            format!("DTEND:{}", format_utc(end)),
            format!("SUMMARY:{} - {}", task.das, task.name),
            format!("DESCRIPTION:{description}"),
            format!("X-ALT-DESC;FMTTYPE=text/html:{description}"),
            format!("UID:{}-{}-timetracker@local", task.id.0, date_to_key(task.date)),
            "END:VEVENT".into(),
        ]);
    }
    lines.push("END:VCALENDAR".into());

    let mut content = lines.join(LINE_END);
    content.push_str(LINE_END);
    content
}

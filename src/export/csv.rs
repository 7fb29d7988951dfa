use crate::{store::entities::TaskEntity, utils::time::{date_to_key, format_seconds}};

pub const HEADER: &str = "Date,DAS,Tâche,Temps";

/// One line per task, oldest date first. Tasks sharing a date keep store order.
pub fn render(tasks: &[TaskEntity]) -> String {
    let mut sorted = tasks.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|v| v.date);

    let mut content = String::from(HEADER);
    content.push('\n');
    for task in sorted {
        content.push_str(&format!(
            "{},{},\"{}\",{}\n",
            date_to_key(task.date),
            task.das,
            task.name.replace('"', "\"\""),
            format_seconds(task.elapsed_time as i64)
        ));
    }
    content
}

use anyhow::{anyhow, Result};
use ansi_term::{Colour, Style};
use chrono::Local;
use clap::Parser;
use tracing::warn;

use super::dates::{parse_optional_day, parse_start_hour, DateStyle, DATE_HELP};
use crate::{
    report::aggregate::{history, today_summary, CategoryTotal},
    store::{
        blob_storage::BlobStorage,
        entities::{TaskEntity, TaskId},
    },
    tracker::{TaskEdit, Tracker},
    utils::time::{format_date_long_fr, format_seconds, parse_hms},
};

#[derive(Debug, Parser)]
pub struct AddCommand {
    #[arg(help = "Name of the task")]
    name: String,
    #[arg(long, short, help = "DAS the time is billed against")]
    das: String,
    #[arg(long, help = format!("Date of the task, today by default. {DATE_HELP}"))]
    date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(long, short, help = "Start the timer right away")]
    start: bool,
}

#[derive(Debug, Parser)]
pub struct EditCommand {
    #[arg(help = "Id of the task, as shown by `list`")]
    id: i64,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    das: Option<String>,
    #[arg(long, help = DATE_HELP)]
    date: Option<String>,
    #[arg(long, help = "Elapsed time as HH:MM:SS. Minutes and seconds above 59 are clamped")]
    time: Option<String>,
    #[arg(long, help = "First start of the day as HH:MM", conflicts_with = "clear_start")]
    start_hour: Option<String>,
    #[arg(long, help = "Forget the first start of the day")]
    clear_start: bool,
    #[arg(long, default_value_t = DateStyle::Uk)]
    date_style: DateStyle,
}

#[derive(Debug, Parser)]
pub struct ListCommand {
    #[arg(long, help = "Show every day instead of today only")]
    history: bool,
}

fn warn_unknown_das<S: BlobStorage>(tracker: &Tracker<S>, das: &str) {
    if !tracker.settings().das_list().iter().any(|v| v == das) {
        warn!("DAS {das} is not part of the configured list");
        println!(
            "{}",
            Colour::Yellow.paint(format!("Warning: \"{das}\" is not a configured DAS"))
        );
    }
}

pub async fn process_add_command<S: BlobStorage>(
    tracker: &mut Tracker<S>,
    AddCommand {
        name,
        das,
        date,
        date_style,
        start,
    }: AddCommand,
) -> Result<()> {
    let date = parse_optional_day(date.as_deref(), date_style, Local::now())?;
    warn_unknown_das(tracker, &das);
    let id = tracker.add_task(name, das, date).await?;
    println!("Added task {id}");
    if start {
        tracker.toggle(id).await?;
        println!("{}", Colour::Green.paint("Timer started"));
    }
    Ok(())
}

pub async fn process_edit_command<S: BlobStorage>(
    tracker: &mut Tracker<S>,
    command: EditCommand,
) -> Result<()> {
    let id = TaskId(command.id);
    let current = tracker
        .store()
        .get(id)
        .ok_or_else(|| anyhow!("No task with id {id}"))?
        .clone();

    let date = parse_optional_day(command.date.as_deref(), command.date_style, Local::now())?;
    let elapsed_seconds = match command.time.as_deref() {
        Some(time) => Some(parse_hms(time).ok_or_else(|| anyhow!("Invalid duration {time}"))?),
        None => None,
    };
    let start_hour = match (command.start_hour.as_deref(), command.clear_start) {
        (Some(hour), _) => Some(Some(parse_start_hour(hour, date.unwrap_or(current.date))?)),
        (None, true) => Some(None),
        (None, false) => None,
    };
    if let Some(das) = &command.das {
        warn_unknown_das(tracker, das);
    }

    tracker
        .edit_task(
            id,
            TaskEdit {
                name: command.name,
                das: command.das,
                date,
                elapsed_seconds,
                start_hour,
            },
        )
        .await?;
    println!("Updated task {id}");
    Ok(())
}

pub async fn process_delete_command<S: BlobStorage>(
    tracker: &mut Tracker<S>,
    id: i64,
) -> Result<()> {
    tracker.delete_task(TaskId(id)).await?;
    println!("Deleted task {id}");
    Ok(())
}

pub async fn process_toggle_command<S: BlobStorage>(
    tracker: &mut Tracker<S>,
    id: i64,
) -> Result<()> {
    let outcome = tracker.toggle(TaskId(id)).await?;
    let name = |id: TaskId| {
        tracker
            .store()
            .get(id)
            .map(|v| v.name.clone())
            .unwrap_or_default()
    };
    for stopped in &outcome.stopped {
        println!("{} {}", Colour::Red.paint("Stopped"), name(*stopped));
    }
    if let Some(started) = outcome.started {
        println!("{} {}", Colour::Green.paint("Started"), name(started));
    }
    Ok(())
}

fn print_task(task: &TaskEntity) {
    let marker = if task.is_running {
        Colour::Green.bold().paint("●").to_string()
    } else {
        " ".into()
    };
    println!(
        "{marker} {}\t{}\t{}\t{}",
        Style::new().dimmed().paint(task.id.to_string()),
        format_seconds(task.elapsed_time as i64),
        task.das,
        task.name
    );
}

fn print_categories(categories: &[CategoryTotal]) {
    for category in categories {
        println!(
            "  {}\t{}",
            format_seconds(category.seconds as i64),
            category.das
        );
    }
}

pub async fn process_list_command<S: BlobStorage>(
    tracker: &Tracker<S>,
    ListCommand { history: show_history }: ListCommand,
) -> Result<()> {
    let snapshot = tracker.snapshot();
    let today = tracker.clock().today();

    if show_history {
        for day in history(&snapshot.tasks) {
            println!(
                "{}\t{}",
                Style::new().bold().paint(format_date_long_fr(day.date)),
                format_seconds(day.total as i64)
            );
            day.tasks.iter().for_each(print_task);
            println!();
        }
        return Ok(());
    }

    let summary = today_summary(&snapshot.tasks, today, &snapshot.settings);
    println!("{}", Style::new().bold().paint(format_date_long_fr(today)));
    if summary.tasks.is_empty() {
        println!("No tasks today");
        return Ok(());
    }
    summary.tasks.iter().for_each(print_task);
    println!();
    print_categories(&summary.categories);
    println!("Total\t{}", format_seconds(summary.total as i64));
    let overtime = format_seconds(summary.overtime as i64);
    if summary.overtime > 0 {
        println!("Heures supp\t{}", Colour::Yellow.paint(overtime));
    } else {
        println!("Heures supp\t{overtime}");
    }
    Ok(())
}

use std::fmt::Display;

use anyhow::Result;
use ansi_term::{Colour, Style};
use chrono::Local;
use clap::{CommandFactory, Parser, ValueEnum};

use super::{
    dates::{parse_optional_day, DateStyle, DATE_HELP},
    Args,
};
use crate::{
    report::{
        aggregate::{chart_slices, report},
        period::Period,
    },
    store::blob_storage::BlobStorage,
    tracker::Tracker,
    utils::time::format_seconds,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PeriodOption {
    Today,
    Week,
    Month,
    SixMonths,
    Custom,
    All,
}

impl Display for PeriodOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self
            .to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_default();
        write!(f, "{value}")
    }
}

#[derive(Debug, Parser)]
pub struct StatsCommand {
    #[arg(long, short, default_value_t = PeriodOption::Today)]
    period: PeriodOption,
    #[arg(long, help = format!("First day of a custom period, today by default. {DATE_HELP}"))]
    from: Option<String>,
    #[arg(long, help = format!("Last day of a custom period, today by default. {DATE_HELP}"))]
    to: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

const BAR_WIDTH: f64 = 30.;

fn resolve_period(command: &StatsCommand) -> Result<Period> {
    let now = Local::now();
    let today = now.date_naive();
    Ok(match command.period {
        PeriodOption::Today => Period::Today,
        PeriodOption::Week => Period::Week,
        PeriodOption::Month => Period::Month,
        PeriodOption::SixMonths => Period::SixMonths,
        PeriodOption::All => Period::All,
        PeriodOption::Custom => {
            let start = parse_optional_day(command.from.as_deref(), command.date_style, now)?
                .unwrap_or(today);
            let end = parse_optional_day(command.to.as_deref(), command.date_style, now)?
                .unwrap_or(today);
            if start > end {
                return Err(Args::command()
                    .error(
                        clap::error::ErrorKind::ValueValidation,
                        format!("Start of the period {start} is after its end {end}"),
                    )
                    .into());
            }
            Period::Custom { start, end }
        }
    })
}

pub async fn process_stats_command<S: BlobStorage>(
    tracker: &Tracker<S>,
    command: StatsCommand,
) -> Result<()> {
    let period = resolve_period(&command)?;
    let snapshot = tracker.snapshot();
    let today = tracker.clock().today();
    let report = report(&snapshot.tasks, &period, today, &snapshot.settings);

    println!(
        "{}",
        Style::new()
            .bold()
            .paint(period.label(today, &snapshot.tasks))
    );
    if report.total == 0 {
        println!("No time recorded");
        return Ok(());
    }

    for slice in chart_slices(&report, &snapshot.settings.das_list()) {
        let (r, g, b) = slice.color;
        let bar = "█".repeat((*slice.percentage / 100. * BAR_WIDTH).round() as usize);
        println!(
            "{}\t{:>4}\t{} {}",
            format_seconds(slice.seconds as i64),
            slice.percentage.to_string(),
            Colour::RGB(r, g, b).paint(bar),
            slice.das
        );
    }
    println!();
    println!("Total\t\t{}", format_seconds(report.total as i64));
    println!("Jours travaillés\t{}", report.work_days);
    let overtime = format_seconds(report.overtime);
    let overtime = if report.overtime < 0 {
        Colour::Red.paint(overtime)
    } else {
        Colour::Green.paint(overtime)
    };
    println!("Heures supp\t{overtime}");

    println!();
    println!("{}", Style::new().bold().paint("Top tâches"));
    for (position, task) in report.top_tasks.iter().enumerate() {
        println!(
            "{}. {}\t{}\t{}",
            position + 1,
            format_seconds(task.elapsed_time as i64),
            task.das,
            task.name
        );
    }
    Ok(())
}

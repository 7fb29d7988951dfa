use anyhow::Result;
use ansi_term::Style;
use clap::{CommandFactory, Parser};

use super::Args;
use crate::{store::blob_storage::BlobStorage, tracker::Tracker};

#[derive(Debug, Parser)]
pub struct SettingsCommand {
    #[arg(long, help = "Expected working hours per day")]
    daily_hours: Option<f64>,
    #[arg(long, num_args = 1.., help = "Replaces the list of DAS")]
    das: Option<Vec<String>>,
    #[arg(long = "name", help = "Employee name shown in workbook exports")]
    employee: Option<String>,
    #[arg(long, help = "Enable or disable auto-save of the daemon")]
    auto_save: Option<bool>,
    #[arg(long, help = "Auto-save interval in minutes")]
    auto_save_interval: Option<u64>,
}

impl SettingsCommand {
    fn is_empty(&self) -> bool {
        self.daily_hours.is_none()
            && self.das.is_none()
            && self.employee.is_none()
            && self.auto_save.is_none()
            && self.auto_save_interval.is_none()
    }
}

fn validation_error(message: &str) -> anyhow::Error {
    Args::command()
        .error(clap::error::ErrorKind::ValueValidation, message)
        .into()
}

pub async fn process_settings_command<S: BlobStorage>(
    tracker: &mut Tracker<S>,
    command: SettingsCommand,
) -> Result<()> {
    if !command.is_empty() {
        let mut settings = tracker.settings().clone();
        if let Some(hours) = command.daily_hours {
            if !hours.is_finite() || !(0. ..=24.).contains(&hours) {
                return Err(validation_error("Daily hours should be between 0 and 24"));
            }
            settings.daily_work_hours = hours;
        }
        if let Some(das) = command.das {
            settings.das_input = das
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
        }
        if let Some(employee) = command.employee {
            settings.employee_name = employee;
        }
        if let Some(enabled) = command.auto_save {
            settings.auto_save_enabled = enabled;
        }
        if let Some(interval) = command.auto_save_interval {
            if interval == 0 {
                return Err(validation_error("Auto-save interval should be at least 1 minute"));
            }
            settings.auto_save_interval = interval;
        }
        tracker.save_settings(settings).await?;
    }

    let settings = tracker.settings();
    let bold = Style::new().bold();
    println!("{}\t{}", bold.paint("Heures par jour"), settings.daily_work_hours);
    println!("{}\t{}", bold.paint("Salarié"), settings.employee_name);
    println!(
        "{}\t{} ({} min)",
        bold.paint("Sauvegarde auto"),
        settings.auto_save_enabled,
        settings.auto_save_interval
    );
    println!("{}", bold.paint("DAS"));
    for das in settings.das_list() {
        println!("  {das}");
    }
    Ok(())
}

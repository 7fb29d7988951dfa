//! File exports. Every renderer reads a snapshot of the tasks and never touches the store.

use std::path::Path;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::ValueEnum;
use tracing::info;

use crate::{
    export::{holidays::FrenchHolidays, workbook::build_workbook},
    store::entities::{Settings, TaskEntity},
    utils::time::date_to_key,
};

pub mod csv;
pub mod holidays;
pub mod ical;
pub mod json;
pub mod workbook;
pub mod xlsx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Xlsx,
    Csv,
    Ics,
    Json,
}

impl ExportFormat {
    pub fn default_file_name(&self, today: NaiveDate) -> String {
        let date = date_to_key(today);
        match self {
            ExportFormat::Xlsx => format!("export_heures_{date}.xlsx"),
            ExportFormat::Csv => format!("export_heures_{date}.csv"),
            ExportFormat::Ics => format!("export_heures_{date}.ics"),
            ExportFormat::Json => format!("compteur_temps_backup_{date}.json"),
        }
    }
}

pub struct ExportRequest<'a> {
    pub tasks: &'a [TaskEntity],
    pub settings: &'a Settings,
    /// Year covered by the workbook.
    pub year: i32,
}

pub fn render(format: ExportFormat, request: &ExportRequest) -> Result<Vec<u8>> {
    let bytes = match format {
        ExportFormat::Xlsx => {
            let layout = build_workbook(
                request.tasks,
                request.settings,
                request.year,
                &FrenchHolidays,
            );
            xlsx::render(&layout)?
        }
        ExportFormat::Csv => csv::render(request.tasks).into_bytes(),
        ExportFormat::Ics => ical::render(request.tasks, &Local).into_bytes(),
        ExportFormat::Json => json::render(request.tasks, request.settings)?.into_bytes(),
    };
    Ok(bytes)
}

pub async fn export_to_file(
    format: ExportFormat,
    request: &ExportRequest<'_>,
    path: &Path,
) -> Result<()> {
    let bytes = render(format, request)?;
    tokio::fs::write(path, &bytes).await?;
    info!(
        "Exported {} tasks as {:?} to {}",
        request.tasks.len(),
        format,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::*;
    use crate::store::entities::{TaskEntity, TaskId};

    #[test]
    fn test_default_file_names() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(
            ExportFormat::Xlsx.default_file_name(today),
            "export_heures_2024-05-06.xlsx"
        );
        assert_eq!(
            ExportFormat::Ics.default_file_name(today),
            "export_heures_2024-05-06.ics"
        );
        assert_eq!(
            ExportFormat::Json.default_file_name(today),
            "compteur_temps_backup_2024-05-06.json"
        );
    }

    #[tokio::test]
    async fn test_export_to_file() {
        let dir = tempdir().unwrap();
        let tasks = vec![TaskEntity::new(
            TaskId(3),
            NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            "Lecture".into(),
            "Formation".into(),
        )];
        let settings = Settings::default();
        let request = ExportRequest {
            tasks: &tasks,
            settings: &settings,
            year: 2024,
        };

        let path = dir.path().join("out.csv");
        export_to_file(ExportFormat::Csv, &request, &path)
            .await
            .unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(
            content,
            "Date,DAS,Tâche,Temps\n2024-05-06,Formation,\"Lecture\",00:00:00\n"
        );
    }
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Parser;

use crate::{
    export::{export_to_file, ExportFormat, ExportRequest},
    store::blob_storage::BlobStorage,
    tracker::Tracker,
};

#[derive(Debug, Parser)]
pub struct ExportCommand {
    #[arg(value_enum, help = "Format of the exported file")]
    format: ExportFormat,
    #[arg(
        long,
        short,
        help = "Destination file. Defaults to export_heures_<date> (compteur_temps_backup_<date> for json) in the current directory"
    )]
    output: Option<PathBuf>,
    #[arg(long, help = "Year covered by the xlsx workbook. Defaults to the current year")]
    year: Option<i32>,
}

pub async fn process_export_command<S: BlobStorage>(
    tracker: &Tracker<S>,
    ExportCommand {
        format,
        output,
        year,
    }: ExportCommand,
) -> Result<()> {
    let today = tracker.clock().today();
    let snapshot = tracker.snapshot();
    let path = output.unwrap_or_else(|| PathBuf::from(format.default_file_name(today)));
    let request = ExportRequest {
        tasks: &snapshot.tasks,
        settings: &snapshot.settings,
        year: year.unwrap_or(today.year()),
    };
    export_to_file(format, &request, &path)
        .await
        .with_context(|| format!("Failed to export into {}", path.display()))?;
    println!("Exported {}", path.display());
    Ok(())
}

pub async fn process_import_command<S: BlobStorage>(
    tracker: &mut Tracker<S>,
    file: &Path,
) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    tracker
        .import(&text)
        .await
        .context("Le fichier sélectionné n'est pas valide")?;
    println!("Imported {} tasks", tracker.store().tasks().len());
    Ok(())
}

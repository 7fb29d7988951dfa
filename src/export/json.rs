use anyhow::Result;

use crate::store::entities::{Settings, Snapshot, TaskEntity};

/// Same document the auto-save writes, so it can be imported back as is.
pub fn render(tasks: &[TaskEntity], settings: &Settings) -> Result<String> {
    let snapshot = Snapshot::new(tasks.to_vec(), settings.clone());
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

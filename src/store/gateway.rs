use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    blob_storage::{BlobKey, BlobStorage},
    entities::{InstanceDescriptor, RunningMarker, Settings, Snapshot, TaskEntity},
    time_store::TimeStore,
};

/// Reasons an imported or persisted snapshot is refused.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot is not valid: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Snapshot is missing `{0}`")]
    MissingField(&'static str),
    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(String),
}

/// Parses and validates a combined snapshot. Nothing is returned unless the whole document is
/// usable, so a failed parse never leaks into the application state.
pub fn parse_snapshot(text: &str) -> Result<Snapshot, SnapshotError> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    let version = value.get("version").and_then(|v| match v {
        serde_json::Value::String(v) if !v.is_empty() => Some(v.clone()),
        serde_json::Value::Number(v) => Some(v.to_string()),
        _ => None,
    });
    let Some(version) = version else {
        return Err(SnapshotError::MissingField("version"));
    };
    if !value.get("tasks").is_some_and(|v| v.is_array()) {
        return Err(SnapshotError::MissingField("tasks"));
    }
    if !value.get("settings").is_some_and(|v| v.is_object()) {
        return Err(SnapshotError::MissingField("settings"));
    }
    if version.split('.').next() != Some("1") {
        return Err(SnapshotError::UnsupportedVersion(version));
    }

    let mut snapshot = Snapshot {
        version,
        tasks: serde_json::from_value(value["tasks"].clone())?,
        settings: serde_json::from_value(value["settings"].clone())?,
    };
    snapshot.tasks = TimeStore::from_tasks(snapshot.tasks).into_tasks();
    Ok(snapshot)
}

/// Everything the application keeps between runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub store: TimeStore,
    pub settings: Settings,
    pub running: Option<RunningMarker>,
}

/// Mirrors the application state into a [BlobStorage]. Only storage failures are reported as
/// errors: malformed blobs are logged and replaced by defaults.
pub struct PersistenceGateway<S: BlobStorage> {
    storage: S,
}

impl<S: BlobStorage> PersistenceGateway<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Loads the combined snapshot, then the task list and the settings, each one overriding the
    /// previous source when it parses. The settings blob is authoritative since it is written
    /// whenever settings are saved.
    pub async fn load_state(&self) -> Result<AppState> {
        let mut state = AppState::default();

        if let Some(text) = self.storage.get(BlobKey::Snapshot).await? {
            match parse_snapshot(&text) {
                Ok(snapshot) => {
                    state.store = TimeStore::from_tasks(snapshot.tasks);
                    state.settings = snapshot.settings;
                }
                Err(e) => warn!("Ignoring saved snapshot: {e}"),
            }
        }

        if let Some(settings) = self.load_settings().await? {
            state.settings = settings;
        }

        if let Some(tasks) = self.load_json::<Vec<TaskEntity>>(BlobKey::Tasks).await? {
            state.store = TimeStore::from_tasks(tasks);
        }

        state.running = self.load_json(BlobKey::RunningTask).await?;

        debug!(
            "Loaded {} tasks, running marker {:?}",
            state.store.tasks().len(),
            state.running
        );
        Ok(state)
    }

    /// Settings as currently persisted, without touching the task blobs. `None` when the blob is
    /// missing or malformed.
    pub async fn load_settings(&self) -> Result<Option<Settings>> {
        self.load_json(BlobKey::Settings).await
    }

    /// Tasks as currently persisted. `None` when the blob is missing or malformed, in which case
    /// callers keep what they already have in memory.
    pub async fn reload_tasks(&self) -> Result<Option<TimeStore>> {
        Ok(self
            .load_json::<Vec<TaskEntity>>(BlobKey::Tasks)
            .await?
            .map(TimeStore::from_tasks))
    }

    async fn load_json<T: DeserializeOwned>(&self, key: BlobKey) -> Result<Option<T>> {
        let Some(text) = self.storage.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&text) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                warn!("Blob {} is malformed, ignoring it: {e}", key.as_str());
                Ok(None)
            }
        }
    }

    async fn save_json<T: Serialize + ?Sized>(&self, key: BlobKey, value: &T) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.storage
            .set(key, text)
            .await
            .with_context(|| format!("Failed to save {}", key.as_str()))
    }

    pub async fn save_tasks(&self, store: &TimeStore) -> Result<()> {
        self.save_json(BlobKey::Tasks, store.tasks()).await
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.save_json(BlobKey::Settings, settings).await
    }

    /// Writes the combined snapshot used by auto-save and as a fallback on load.
    pub async fn save_snapshot(&self, store: &TimeStore, settings: &Settings) -> Result<()> {
        let snapshot = Snapshot::new(store.tasks().to_vec(), settings.clone());
        self.save_json(BlobKey::Snapshot, &snapshot).await?;
        info!("Saved snapshot with {} tasks", snapshot.tasks.len());
        Ok(())
    }

    /// Replaces tasks and settings with an imported snapshot and persists all of them.
    pub async fn import(&self, text: &str) -> Result<AppState> {
        let snapshot = parse_snapshot(text)?;
        let state = AppState {
            store: TimeStore::from_tasks(snapshot.tasks),
            settings: snapshot.settings,
            running: None,
        };
        self.save_tasks(&state.store).await?;
        self.save_settings(&state.settings).await?;
        self.save_snapshot(&state.store, &state.settings).await?;
        self.clear_running_marker().await?;
        Ok(state)
    }

    pub async fn save_running_marker(&self, marker: &RunningMarker) -> Result<()> {
        self.save_json(BlobKey::RunningTask, marker).await
    }

    pub async fn clear_running_marker(&self) -> Result<()> {
        self.storage.remove(BlobKey::RunningTask).await
    }

    pub async fn load_close_time(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(text) = self.storage.get(BlobKey::LastCloseTime).await? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(text.trim().trim_matches('"')) {
            Ok(v) => Ok(Some(v.with_timezone(&Utc))),
            Err(e) => {
                warn!("Close time {text:?} is malformed, ignoring it: {e}");
                Ok(None)
            }
        }
    }

    pub async fn save_close_time(&self, time: DateTime<Utc>) -> Result<()> {
        self.storage
            .set(
                BlobKey::LastCloseTime,
                time.to_rfc3339_opts(SecondsFormat::Millis, true),
            )
            .await
    }

    pub async fn clear_close_time(&self) -> Result<()> {
        self.storage.remove(BlobKey::LastCloseTime).await
    }

    pub async fn load_instances(&self) -> Result<Vec<InstanceDescriptor>> {
        Ok(self
            .load_json(BlobKey::ActiveInstances)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_instances(&self, instances: &[InstanceDescriptor]) -> Result<()> {
        self.save_json(BlobKey::ActiveInstances, instances).await
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::store::{
        blob_storage::MemoryBlobStorage,
        entities::{Settings, TaskId},
    };

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

    fn test_store() -> TimeStore {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let mut store = TimeStore::default();
        store
            .add("Write report".into(), "A".into(), TEST_DATE, now)
            .unwrap();
        store
            .add("Call \"client\"".into(), "B".into(), TEST_DATE, now)
            .unwrap();
        store.get_mut(TaskId(now.timestamp_millis())).unwrap().elapsed_time = 3600;
        store
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() -> Result<()> {
        let gateway = PersistenceGateway::new(MemoryBlobStorage::default());
        let store = test_store();
        let settings = Settings {
            employee_name: "Alice".into(),
            ..Default::default()
        };

        let exported = serde_json::to_string_pretty(&Snapshot::new(
            store.tasks().to_vec(),
            settings.clone(),
        ))?;
        let imported = gateway.import(&exported).await?;

        assert_eq!(imported.store, store);
        assert_eq!(imported.settings, settings);

        let reloaded = gateway.load_state().await?;
        assert_eq!(reloaded.store, store);
        assert_eq!(reloaded.settings, settings);
        Ok(())
    }

    #[test]
    fn test_parse_snapshot_rejects_missing_fields() {
        assert!(matches!(
            parse_snapshot(r#"{"tasks":[],"settings":{}}"#),
            Err(SnapshotError::MissingField("version"))
        ));
        assert!(matches!(
            parse_snapshot(r#"{"version":"1.0","settings":{}}"#),
            Err(SnapshotError::MissingField("tasks"))
        ));
        assert!(matches!(
            parse_snapshot(r#"{"version":"1.0","tasks":[]}"#),
            Err(SnapshotError::MissingField("settings"))
        ));
        assert!(matches!(
            parse_snapshot(r#"{"version":"","tasks":[],"settings":{}}"#),
            Err(SnapshotError::MissingField("version"))
        ));
        assert!(matches!(
            parse_snapshot("not json"),
            Err(SnapshotError::Malformed(_))
        ));
        assert!(matches!(
            parse_snapshot(r#"{"version":"2.0","tasks":[],"settings":{}}"#),
            Err(SnapshotError::UnsupportedVersion(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_import_keeps_previous_state() -> Result<()> {
        let gateway = PersistenceGateway::new(MemoryBlobStorage::default());
        let store = test_store();
        gateway.save_tasks(&store).await?;

        assert!(gateway
            .import(r#"{"version":"1.0","tasks":[{"id":1}],"settings":{}}"#)
            .await
            .is_err());

        assert_eq!(gateway.load_state().await?.store, store);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_blobs_fall_back() -> Result<()> {
        let storage = MemoryBlobStorage::default();
        storage.set(BlobKey::Settings, "{broken".into()).await?;
        storage.set(BlobKey::Tasks, "[{}]".into()).await?;
        storage.set(BlobKey::LastCloseTime, "yesterday".into()).await?;
        let gateway = PersistenceGateway::new(storage);

        let state = gateway.load_state().await?;
        assert_eq!(state.settings, Settings::default());
        assert!(state.store.is_empty());
        assert_eq!(gateway.load_close_time().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_tasks_blob_overrides_snapshot() -> Result<()> {
        let gateway = PersistenceGateway::new(MemoryBlobStorage::default());
        let store = test_store();
        gateway
            .save_snapshot(&TimeStore::default(), &Settings::default())
            .await?;
        gateway.save_tasks(&store).await?;

        assert_eq!(gateway.load_state().await?.store, store);
        Ok(())
    }

    #[tokio::test]
    async fn test_saved_settings_win_over_snapshot() -> Result<()> {
        let gateway = PersistenceGateway::new(MemoryBlobStorage::default());
        let store = test_store();
        gateway.save_snapshot(&store, &Settings::default()).await?;

        let settings = Settings {
            daily_work_hours: 7.,
            auto_save_interval: 5,
            ..Default::default()
        };
        gateway.save_settings(&settings).await?;

        let state = gateway.load_state().await?;
        assert_eq!(state.settings, settings);
        assert_eq!(state.store, store);
        assert_eq!(gateway.load_settings().await?, Some(settings));
        Ok(())
    }

    #[tokio::test]
    async fn test_snapshot_settings_used_without_settings_blob() -> Result<()> {
        let gateway = PersistenceGateway::new(MemoryBlobStorage::default());
        let settings = Settings {
            employee_name: "Alice".into(),
            ..Default::default()
        };
        gateway.save_snapshot(&TimeStore::default(), &settings).await?;

        assert_eq!(gateway.load_settings().await?, None);
        assert_eq!(gateway.load_state().await?.settings, settings);
        Ok(())
    }

    #[tokio::test]
    async fn test_close_time_round_trip() -> Result<()> {
        let gateway = PersistenceGateway::new(MemoryBlobStorage::default());
        let time = Utc.with_ymd_and_hms(2024, 3, 4, 18, 30, 0).unwrap();
        gateway.save_close_time(time).await?;
        assert_eq!(gateway.load_close_time().await?, Some(time));
        gateway.clear_close_time().await?;
        assert_eq!(gateway.load_close_time().await?, None);
        Ok(())
    }
}

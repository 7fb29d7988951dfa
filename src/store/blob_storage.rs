use std::{
    collections::HashMap,
    future::Future,
    ops::Deref,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::Result;
use tracing::trace;

use crate::fs::operations::{overwrite_locked, read_locked, remove_if_exists};

/// Keys of the persisted blobs. Names are kept compatible with data exported by earlier
/// versions of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobKey {
    Tasks,
    Settings,
    Snapshot,
    LastCloseTime,
    RunningTask,
    ActiveInstances,
}

impl BlobKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobKey::Tasks => "timeTrackerTasks",
            BlobKey::Settings => "timeTrackerSettings",
            BlobKey::Snapshot => "timeTrackerData",
            BlobKey::LastCloseTime => "lastCloseTime",
            BlobKey::RunningTask => "currentRunningTask",
            BlobKey::ActiveInstances => "activeInstances",
        }
    }
}

/// Interface for abstracting a key-value store of text blobs shared by every process of the
/// application.
pub trait BlobStorage {
    fn get(&self, key: BlobKey) -> impl Future<Output = Result<Option<String>>>;

    fn set(&self, key: BlobKey, value: String) -> impl Future<Output = Result<()>>;

    fn remove(&self, key: BlobKey) -> impl Future<Output = Result<()>>;
}

impl<T: Deref> BlobStorage for T
where
    T::Target: BlobStorage,
{
    fn get(&self, key: BlobKey) -> impl Future<Output = Result<Option<String>>> {
        self.deref().get(key)
    }

    fn set(&self, key: BlobKey, value: String) -> impl Future<Output = Result<()>> {
        self.deref().set(key, value)
    }

    fn remove(&self, key: BlobKey) -> impl Future<Output = Result<()>> {
        self.deref().remove(key)
    }
}

pub const STORAGE_DIR_NAME: &str = "storage";

/// The main realization of [BlobStorage]. Every key lives in its own file inside `blob_dir`.
pub struct FileBlobStorage {
    blob_dir: PathBuf,
}

impl FileBlobStorage {
    pub fn new(blob_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&blob_dir)?;

        Ok(Self { blob_dir })
    }

    /// Storage shared by the CLI and the daemon inside the application directory.
    pub fn in_application_dir(app_dir: &Path) -> Result<Self, std::io::Error> {
        Self::new(app_dir.join(STORAGE_DIR_NAME))
    }

    fn path(&self, key: BlobKey) -> PathBuf {
        self.blob_dir.join(format!("{}.json", key.as_str()))
    }
}

impl BlobStorage for FileBlobStorage {
    async fn get(&self, key: BlobKey) -> Result<Option<String>> {
        trace!("Reading blob {key:?}");
        read_locked(&self.path(key)).await
    }

    async fn set(&self, key: BlobKey, value: String) -> Result<()> {
        trace!("Writing blob {key:?}");
        overwrite_locked(&self.path(key), value.as_bytes()).await
    }

    async fn remove(&self, key: BlobKey) -> Result<()> {
        trace!("Removing blob {key:?}");
        remove_if_exists(&self.path(key)).await
    }
}

/// Process local storage. Used by tests and by dry runs.
#[derive(Default)]
pub struct MemoryBlobStorage {
    blobs: Mutex<HashMap<BlobKey, String>>,
}

impl MemoryBlobStorage {
    fn blobs(&self) -> std::sync::MutexGuard<'_, HashMap<BlobKey, String>> {
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BlobStorage for MemoryBlobStorage {
    async fn get(&self, key: BlobKey) -> Result<Option<String>> {
        Ok(self.blobs().get(&key).cloned())
    }

    async fn set(&self, key: BlobKey, value: String) -> Result<()> {
        self.blobs().insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: BlobKey) -> Result<()> {
        self.blobs().remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{BlobKey, BlobStorage, FileBlobStorage};

    #[tokio::test]
    async fn test_file_blob_storage_basic() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileBlobStorage::new(dir.path().join("storage"))?;

        assert_eq!(storage.get(BlobKey::Tasks).await?, None);

        storage.set(BlobKey::Tasks, "[]".into()).await?;
        storage.set(BlobKey::Settings, "{}".into()).await?;
        assert_eq!(storage.get(BlobKey::Tasks).await?.as_deref(), Some("[]"));

        storage.remove(BlobKey::Tasks).await?;
        assert_eq!(storage.get(BlobKey::Tasks).await?, None);
        assert_eq!(storage.get(BlobKey::Settings).await?.as_deref(), Some("{}"));

        assert!(dir.path().join("storage/timeTrackerSettings.json").exists());
        Ok(())
    }
}

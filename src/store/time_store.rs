use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

use super::entities::{TaskEntity, TaskId};

/// Ordered collection of tasks. Insertion order is preserved since reports break ties with it.
///
/// Holds the invariant that at most one task is running.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeStore {
    tasks: Vec<TaskEntity>,
}

impl TimeStore {
    /// Builds a store from persisted tasks. If several tasks claim to be running only the first
    /// one keeps its run.
    pub fn from_tasks(mut tasks: Vec<TaskEntity>) -> Self {
        let mut running_seen = false;
        for task in tasks.iter_mut().filter(|v| v.is_running) {
            if running_seen {
                warn!("Task {} was also marked as running, stopping it", task.id);
                task.is_running = false;
                task.start_time = None;
                task.initial_elapsed_time = task.elapsed_time;
            }
            running_seen = true;
        }
        Self { tasks }
    }

    pub fn tasks(&self) -> &[TaskEntity] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<TaskEntity> {
        self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskEntity> {
        self.tasks.iter().find(|v| v.id == id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut TaskEntity> {
        self.tasks.iter_mut().find(|v| v.id == id)
    }

    pub fn running(&self) -> Option<&TaskEntity> {
        self.tasks.iter().find(|v| v.is_running)
    }

    pub fn running_mut(&mut self) -> Option<&mut TaskEntity> {
        self.tasks.iter_mut().find(|v| v.is_running)
    }

    /// Creates a task for `date`. The id is derived from `now`, bumped if another task already
    /// took that millisecond.
    pub fn add(
        &mut self,
        name: String,
        das: String,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<TaskId> {
        if name.trim().is_empty() || das.trim().is_empty() {
            return Err(anyhow!("A task needs both a name and a DAS"));
        }
        let mut id = now.timestamp_millis();
        if let Some(max) = self.tasks.iter().map(|v| v.id.0).max() {
            id = id.max(max + 1);
        }
        let id = TaskId(id);
        self.tasks.push(TaskEntity::new(id, date, name, das));
        Ok(id)
    }

    pub fn remove(&mut self, id: TaskId) -> Option<TaskEntity> {
        let index = self.tasks.iter().position(|v| v.id == id)?;
        Some(self.tasks.remove(index))
    }

    /// Brings running tasks up to `now`. Returns the seconds credited.
    pub fn sync_running(&mut self, now: DateTime<Utc>) -> u64 {
        self.tasks.iter_mut().map(|v| v.sync(now)).sum()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

    #[test]
    fn test_from_tasks_keeps_single_running() {
        let mut a = TaskEntity::new(TaskId(1), TEST_DATE, "a".into(), "A".into());
        let mut b = TaskEntity::new(TaskId(2), TEST_DATE, "b".into(), "A".into());
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        a.start(now);
        b.start(now);
        let store = TimeStore::from_tasks(vec![a, b]);
        assert_eq!(store.tasks().iter().filter(|v| v.is_running).count(), 1);
        assert_eq!(store.running().map(|v| v.id), Some(TaskId(1)));
        assert_eq!(store.get(TaskId(2)).unwrap().start_time, None);
    }

    #[test]
    fn test_add_generates_unique_ids() -> Result<()> {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let mut store = TimeStore::default();
        let a = store.add("a".into(), "A".into(), TEST_DATE, now)?;
        let b = store.add("b".into(), "A".into(), TEST_DATE, now)?;
        assert_ne!(a, b);
        assert_eq!(a.0, now.timestamp_millis());
        Ok(())
    }

    #[test]
    fn test_add_rejects_blank_fields() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let mut store = TimeStore::default();
        assert!(store.add(" ".into(), "A".into(), TEST_DATE, now).is_err());
        assert!(store.add("a".into(), "".into(), TEST_DATE, now).is_err());
        assert!(store.is_empty());
    }
}

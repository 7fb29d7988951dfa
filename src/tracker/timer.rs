use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::store::{
    entities::{RunningMarker, TaskId},
    time_store::TimeStore,
};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// What a toggle changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToggleOutcome {
    pub started: Option<TaskId>,
    pub stopped: Vec<TaskId>,
}

/// Time credited to a running task while nothing was watching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit {
    pub task_id: TaskId,
    pub task_name: String,
    pub seconds: u64,
}

/// Advances the running task. Elapsed time is derived from the start instant of the current
/// run, so missed ticks never lose time and a late tick never counts twice.
pub struct TimerEngine {
    tick_interval: Duration,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl TimerEngine {
    pub fn new(tick_interval: Duration) -> Self {
        Self { tick_interval }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Starts a stopped task or stops a running one. Starting stops every other running task
    /// first, which keeps at most one task running.
    pub fn toggle(
        &self,
        store: &mut TimeStore,
        id: TaskId,
        now: DateTime<Utc>,
    ) -> Result<ToggleOutcome> {
        let was_running = store
            .get(id)
            .ok_or_else(|| anyhow!("No task with id {id}"))?
            .is_running;

        let mut outcome = ToggleOutcome::default();
        if was_running {
            if let Some(task) = store.get_mut(id) {
                task.stop(now);
                info!("Stopped task {id} at {}s", task.elapsed_time);
            }
            outcome.stopped.push(id);
            return Ok(outcome);
        }

        let others = store
            .tasks()
            .iter()
            .filter(|v| v.is_running && v.id != id)
            .map(|v| v.id)
            .collect::<Vec<_>>();
        for other in others {
            if let Some(task) = store.get_mut(other) {
                task.stop(now);
                debug!("Stopped task {other} to start {id}");
            }
            outcome.stopped.push(other);
        }

        if let Some(task) = store.get_mut(id) {
            task.start(now);
            info!("Started task {id}");
        }
        outcome.started = Some(id);
        Ok(outcome)
    }

    /// Brings the running task up to `now`. Returns the marker describing the run, if any.
    pub fn tick(&self, store: &mut TimeStore, now: DateTime<Utc>) -> Option<RunningMarker> {
        let task = store.running_mut()?;
        task.sync(now);
        Some(RunningMarker {
            task_id: task.id,
            start_time: task.start_time.unwrap_or(now),
            last_update_time: now,
        })
    }

    /// Reconciles running tasks after a restart. Tasks persisted without a start instant resume
    /// from the latest moment their elapsed time was known to be current: the running marker or
    /// the close time.
    pub fn resume(
        &self,
        store: &mut TimeStore,
        marker: Option<&RunningMarker>,
        close_time: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Vec<Credit> {
        let mut credits = vec![];
        let Some(task) = store.running_mut() else {
            return credits;
        };

        if task.start_time.is_none() {
            let marker_time = marker
                .filter(|v| v.task_id == task.id)
                .map(|v| v.last_update_time);
            let resume_from = marker_time.max(close_time).unwrap_or(now).min(now);
            debug!("Task {} resumes from {resume_from}", task.id);
            task.start_time = Some(resume_from);
            task.initial_elapsed_time = task.elapsed_time;
        }

        let seconds = task.sync(now);
        if seconds > 0 {
            info!("Credited {seconds}s to task {} after restart", task.id);
            credits.push(Credit {
                task_id: task.id,
                task_name: task.name.clone(),
                seconds,
            });
        }
        credits
    }
}

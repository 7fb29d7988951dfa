//! The root controller. [Tracker] owns the application state and is the only place where it is
//! mutated, both for one-shot CLI commands and for the daemon loop.

pub mod notify;
pub mod timer;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use notify::{notify_quietly, Notification, Notifier};
use timer::{Credit, TimerEngine, ToggleOutcome};
use tracing::{debug, info, warn};

use crate::{
    store::{
        blob_storage::BlobStorage,
        entities::{Settings, Snapshot, TaskId},
        gateway::{AppState, PersistenceGateway},
        time_store::TimeStore,
    },
    utils::clock::Clock,
};

/// Changes applied to an existing task. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub name: Option<String>,
    pub das: Option<String>,
    pub date: Option<NaiveDate>,
    pub elapsed_seconds: Option<u64>,
    /// `Some(None)` clears the start hour.
    pub start_hour: Option<Option<DateTime<Utc>>>,
}

pub struct Tracker<S: BlobStorage> {
    gateway: PersistenceGateway<S>,
    state: AppState,
    timer: TimerEngine,
    notifier: Box<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl<S: BlobStorage> Tracker<S> {
    pub async fn load(
        gateway: PersistenceGateway<S>,
        notifier: Box<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let state = gateway.load_state().await?;
        Ok(Self {
            gateway,
            state,
            timer: TimerEngine::default(),
            notifier,
            clock,
        })
    }

    pub fn store(&self) -> &TimeStore {
        &self.state.store
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    pub fn gateway(&self) -> &PersistenceGateway<S> {
        &self.gateway
    }

    pub fn timer(&self) -> &TimerEngine {
        &self.timer
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Current content with running tasks brought up to date. Nothing is persisted.
    pub fn snapshot(&self) -> Snapshot {
        let mut store = self.state.store.clone();
        store.sync_running(self.clock.time());
        Snapshot::new(store.into_tasks(), self.state.settings.clone())
    }

    pub async fn add_task(
        &mut self,
        name: String,
        das: String,
        date: Option<NaiveDate>,
    ) -> Result<TaskId> {
        let date = date.unwrap_or_else(|| self.clock.today());
        let id = self
            .state
            .store
            .add(name, das, date, self.clock.time())?;
        info!("Added task {id} for {date}");
        self.persist_tasks().await?;
        self.auto_save().await?;
        Ok(id)
    }

    pub async fn edit_task(&mut self, id: TaskId, edit: TaskEdit) -> Result<()> {
        let now = self.clock.time();
        let task = self
            .state
            .store
            .get_mut(id)
            .ok_or_else(|| anyhow!("No task with id {id}"))?;

        if let Some(name) = edit.name.filter(|v| !v.trim().is_empty()) {
            task.name = name;
        }
        if let Some(das) = edit.das.filter(|v| !v.trim().is_empty()) {
            task.das = das;
        }
        if let Some(date) = edit.date {
            task.date = date;
        }
        if let Some(seconds) = edit.elapsed_seconds {
            task.set_elapsed(seconds, now);
        }
        if let Some(start_hour) = edit.start_hour {
            task.start_hour = start_hour;
        }
        info!("Edited task {id}");

        self.persist_tasks().await?;
        self.auto_save().await
    }

    pub async fn delete_task(&mut self, id: TaskId) -> Result<()> {
        let removed = self
            .state
            .store
            .remove(id)
            .ok_or_else(|| anyhow!("No task with id {id}"))?;
        if removed.is_running {
            self.gateway.clear_running_marker().await?;
        }
        info!("Deleted task {id}");
        self.persist_tasks().await
    }

    pub async fn toggle(&mut self, id: TaskId) -> Result<ToggleOutcome> {
        let now = self.clock.time();
        let outcome = self.timer.toggle(&mut self.state.store, id, now)?;
        self.persist_tasks().await?;
        match self.timer.tick(&mut self.state.store, now) {
            Some(marker) => self.gateway.save_running_marker(&marker).await?,
            None => self.gateway.clear_running_marker().await?,
        }
        self.gateway.clear_close_time().await?;
        Ok(outcome)
    }

    /// One timer tick. Tasks are reloaded first so edits made by other processes are not
    /// overwritten.
    pub async fn tick(&mut self) -> Result<()> {
        if let Some(store) = self.gateway.reload_tasks().await? {
            self.state.store = store;
        }
        let now = self.clock.time();
        if let Some(marker) = self.timer.tick(&mut self.state.store, now) {
            self.persist_tasks().await?;
            self.gateway.save_running_marker(&marker).await?;
            self.state.running = Some(marker);
        } else if self.state.running.take().is_some() {
            self.gateway.clear_running_marker().await?;
        }
        Ok(())
    }

    /// Settings may be changed by another process. Returns whether they did.
    pub async fn reload_settings(&mut self) -> Result<bool> {
        let Some(settings) = self.gateway.load_settings().await? else {
            return Ok(false);
        };
        if settings != self.state.settings {
            debug!("Settings changed on disk");
            self.state.settings = settings;
            return Ok(true);
        }
        Ok(false)
    }

    /// Credits a running task with the time elapsed since the application was closed and clears
    /// the close marker.
    pub async fn reopen(&mut self) -> Result<Vec<Credit>> {
        let close_time = self.gateway.load_close_time().await?;
        let now = self.clock.time();
        let credits = self.timer.resume(
            &mut self.state.store,
            self.state.running.as_ref(),
            close_time,
            now,
        );

        for credit in &credits {
            let minutes = credit.seconds / 60;
            if minutes > 0 {
                notify_quietly(
                    self.notifier.as_ref(),
                    &Notification {
                        title: "Temps ajouté".into(),
                        body: format!(
                            "{minutes} minute(s) ajoutée(s) à la tâche \"{}\"",
                            credit.task_name
                        ),
                        tag: format!("time-added-{}", credit.task_id),
                    },
                );
            }
        }

        if self.state.store.running().is_some() {
            self.persist_tasks().await?;
        }
        if close_time.is_some() {
            self.gateway.clear_close_time().await?;
        }
        Ok(credits)
    }

    /// Records the close instant when a task is running and flushes the tasks.
    pub async fn close(&mut self) -> Result<()> {
        let now = self.clock.time();
        self.state.store.sync_running(now);
        if self.state.store.running().is_some() {
            self.gateway.save_close_time(now).await?;
        }
        self.persist_tasks().await?;
        self.gateway.clear_running_marker().await
    }

    /// Persists the settings and rewrites the snapshot so both carry them.
    pub async fn save_settings(&mut self, settings: Settings) -> Result<()> {
        self.gateway.save_settings(&settings).await?;
        self.state.settings = settings;
        info!("Saved settings");
        self.auto_save().await
    }

    /// Writes the combined snapshot. Failures are logged, never propagated.
    pub async fn auto_save(&self) -> Result<()> {
        if let Err(e) = self
            .gateway
            .save_snapshot(&self.state.store, &self.state.settings)
            .await
        {
            warn!("Auto-save failed {e:?}");
        }
        Ok(())
    }

    pub async fn import(&mut self, text: &str) -> Result<()> {
        self.state = self.gateway.import(text).await?;
        info!("Imported {} tasks", self.state.store.tasks().len());
        Ok(())
    }

    async fn persist_tasks(&self) -> Result<()> {
        self.gateway.save_tasks(&self.state.store).await
    }
}

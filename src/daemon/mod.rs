use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use instance::InstanceCoordinator;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::{
    store::{
        blob_storage::{BlobStorage, FileBlobStorage},
        gateway::PersistenceGateway,
    },
    tracker::{
        notify::{LogNotifier, Notifier},
        Tracker,
    },
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod instance;
pub mod shutdown;

const MIN_AUTO_SAVE_INTERVAL: Duration = Duration::from_secs(60);

/// Represents the starting point for the daemon
pub async fn start_daemon(dir: PathBuf) -> Result<()> {
    let storage = FileBlobStorage::in_application_dir(&dir)?;

    let shutdown_token = CancellationToken::new();
    tokio::spawn(shutdown::detect_shutdown(shutdown_token.clone()));

    let session = create_session(
        storage,
        Box::new(LogNotifier),
        Arc::new(DefaultClock),
        shutdown_token,
    )
    .await?;

    session.run().await.inspect_err(|e| {
        error!("Daemon session stopped with an error {e:?}");
    })
}

async fn create_session<S: BlobStorage>(
    storage: S,
    notifier: Box<dyn Notifier>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
) -> Result<Session<S>> {
    let coordinator = InstanceCoordinator::created_at(clock.time());
    let tracker = Tracker::load(PersistenceGateway::new(storage), notifier, clock.clone()).await?;
    Ok(Session {
        tracker,
        coordinator,
        clock,
        shutdown,
    })
}

/// A running daemon. Every periodic job is driven from a single loop so the tracker never
/// needs to be shared.
pub struct Session<S: BlobStorage> {
    tracker: Tracker<S>,
    coordinator: InstanceCoordinator,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
}

fn auto_save_deadline<S: BlobStorage>(tracker: &Tracker<S>, from: Instant) -> Option<Instant> {
    let settings = tracker.settings();
    if !settings.auto_save_enabled {
        return None;
    }
    let interval = Duration::from_secs(settings.auto_save_interval.saturating_mul(60))
        .max(MIN_AUTO_SAVE_INTERVAL);
    Some(from + interval)
}

async fn sleep_until_opt(clock: &dyn Clock, deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => clock.sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl<S: BlobStorage> Session<S> {
    /// Executes the daemon event loop until the shutdown token is cancelled.
    pub async fn run(self) -> Result<()> {
        let Session {
            mut tracker,
            mut coordinator,
            clock,
            shutdown,
        } = self;

        info!("Instance {} starting", coordinator.id());
        tracker
            .reopen()
            .instrument(info_span!("Reconciling closed time"))
            .await?;
        coordinator.refresh(tracker.gateway(), clock.time()).await?;

        let tick_interval = tracker.timer().tick_interval();
        let ping_interval = coordinator.ping_interval();
        let mut next_tick = clock.instant() + tick_interval;
        let mut next_ping = clock.instant() + ping_interval;
        let mut next_save = auto_save_deadline(&tracker, clock.instant());

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    break;
                }
                _ = clock.sleep_until(next_tick) => {
                    if let Err(e) = tracker.tick().await {
                        error!("Timer tick failed {e:?}");
                    }
                    next_tick = clock.instant() + tick_interval;
                }
                _ = clock.sleep_until(next_ping) => {
                    if let Err(e) = coordinator.refresh(tracker.gateway(), clock.time()).await {
                        warn!("Failed to refresh instance list {e:?}");
                    }
                    match tracker.reload_settings().await {
                        Ok(true) => next_save = auto_save_deadline(&tracker, clock.instant()),
                        Ok(false) => (),
                        Err(e) => warn!("Failed to reload settings {e:?}"),
                    }
                    next_ping = clock.instant() + ping_interval;
                }
                _ = sleep_until_opt(clock.as_ref(), next_save) => {
                    match coordinator.refresh(tracker.gateway(), clock.time()).await {
                        Ok(true) => tracker.auto_save().await?,
                        Ok(false) => info!("Skipping auto-save, another instance is primary"),
                        Err(e) => warn!("Failed to check primary instance {e:?}"),
                    }
                    next_save = auto_save_deadline(&tracker, clock.instant());
                }
            }
        }

        info!("Instance {} shutting down", coordinator.id());
        let close_result = tracker.close().await;
        let leave_result = coordinator.leave(tracker.gateway()).await;
        close_result?;
        leave_result
    }
}

#[cfg(test)]
mod daemon_tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::{create_session, instance::InstanceCoordinator},
        store::{
            blob_storage::{BlobKey, BlobStorage, FileBlobStorage, MemoryBlobStorage},
            entities::Settings,
            gateway::PersistenceGateway,
        },
        tracker::{notify::LogNotifier, Tracker},
        utils::{
            clock::{Clock, TestClock},
            logging::TEST_LOGGING,
        },
    };

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    /// Runs a daemon against on-disk storage while a "CLI" starts a task, then checks what the
    /// daemon left behind after shutdown.
    #[tokio::test(start_paused = true)]
    async fn smoke_test_daemon() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let clock = Arc::new(TestClock::starting_at(Utc.from_utc_datetime(&TEST_START_DATE)));
        let shutdown_token = CancellationToken::new();

        let mut cli = Tracker::load(
            PersistenceGateway::new(FileBlobStorage::new(dir.path().join("storage"))?),
            Box::new(LogNotifier),
            clock.clone(),
        )
        .await?;
        let id = cli.add_task("Smoke".into(), "Support".into(), None).await?;
        cli.toggle(id).await?;

        let session = create_session(
            FileBlobStorage::new(dir.path().join("storage"))?,
            Box::new(LogNotifier),
            clock.clone(),
            shutdown_token.clone(),
        )
        .await?;

        let (_, session_result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(5500)).await;
                shutdown_token.cancel()
            },
            session.run(),
        );
        session_result?;

        let storage = FileBlobStorage::new(dir.path().join("storage"))?;
        let state = PersistenceGateway::new(&storage).load_state().await?;
        let task = state.store.get(id).unwrap();
        assert!(task.is_running);
        assert_eq!(task.elapsed_time, 5);
        assert!(storage.get(BlobKey::LastCloseTime).await?.is_some());
        assert_eq!(storage.get(BlobKey::ActiveInstances).await?.as_deref(), Some("[]"));
        assert_eq!(storage.get(BlobKey::RunningTask).await?, None);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_primary_auto_saves() -> Result<()> {
        let storage = Arc::new(MemoryBlobStorage::default());
        let clock = Arc::new(TestClock::starting_at(Utc.from_utc_datetime(&TEST_START_DATE)));
        PersistenceGateway::new(storage.clone())
            .save_settings(&Settings {
                auto_save_interval: 1,
                ..Default::default()
            })
            .await?;

        let shutdown_token = CancellationToken::new();
        let primary = create_session(
            storage.clone(),
            Box::new(LogNotifier),
            clock.clone(),
            shutdown_token.clone(),
        )
        .await?;

        let (_, result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_secs(61)).await;
                shutdown_token.cancel()
            },
            primary.run(),
        );
        result?;
        assert!(storage.get(BlobKey::Snapshot).await?.is_some());

        // A second, newer instance next to a live older one never writes the snapshot.
        storage.remove(BlobKey::Snapshot).await?;
        let mut older = InstanceCoordinator::created_at(Utc.from_utc_datetime(&TEST_START_DATE));
        let shutdown_token = CancellationToken::new();
        let secondary = create_session(
            storage.clone(),
            Box::new(LogNotifier),
            clock.clone(),
            shutdown_token.clone(),
        )
        .await?;
        let gateway = PersistenceGateway::new(storage.clone());
        let (_, _, result) = tokio::join!(
            async {
                for _ in 0..31 {
                    older.refresh(&gateway, clock.time()).await?;
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
                anyhow::Ok(())
            },
            async {
                tokio::time::sleep(Duration::from_secs(61)).await;
                shutdown_token.cancel()
            },
            secondary.run(),
        );
        result?;
        assert_eq!(storage.get(BlobKey::Snapshot).await?, None);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_changed_by_cli_reach_running_daemon() -> Result<()> {
        let storage = Arc::new(MemoryBlobStorage::default());
        let clock = Arc::new(TestClock::starting_at(Utc.from_utc_datetime(&TEST_START_DATE)));
        PersistenceGateway::new(storage.clone())
            .save_settings(&Settings {
                auto_save_interval: 10,
                ..Default::default()
            })
            .await?;

        let shutdown_token = CancellationToken::new();
        let session = create_session(
            storage.clone(),
            Box::new(LogNotifier),
            clock.clone(),
            shutdown_token.clone(),
        )
        .await?;

        let (cli_result, _, result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                let mut cli = Tracker::load(
                    PersistenceGateway::new(storage.clone()),
                    Box::new(LogNotifier),
                    clock.clone(),
                )
                .await?;
                cli.save_settings(Settings {
                    auto_save_interval: 1,
                    ..Default::default()
                })
                .await?;
                // Only a write from the daemon can bring it back
                storage.remove(BlobKey::Snapshot).await?;
                anyhow::Ok(())
            },
            async {
                tokio::time::sleep(Duration::from_secs(70)).await;
                shutdown_token.cancel()
            },
            session.run(),
        );
        cli_result?;
        result?;
        assert!(storage.get(BlobKey::Snapshot).await?.is_some());
        Ok(())
    }
}

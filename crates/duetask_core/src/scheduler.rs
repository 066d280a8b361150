use crate::storage::Persistence;
use crate::store::SharedStore;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_CLEANUP_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Runs retention cleanup on a fixed period for as long as it is alive.
///
/// The first run happens immediately. Each run takes the store lock, so it
/// waits for any mutation that is still saving. Dropping the scheduler without
/// calling [`CleanupScheduler::stop`] aborts the background task.
pub struct CleanupScheduler {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CleanupScheduler {
    pub fn start<P>(store: SharedStore<P>, period: Duration) -> Self
    where
        P: Persistence + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            log::debug!("cleanup scheduler started, period {}s", period.as_secs());

            loop {
                // A due tick runs before shutdown is honoured, so the first
                // cleanup always happens.
                tokio::select! {
                    biased;
                    _ = ticker.tick() => {
                        let mut guard = store.lock().await;
                        let now = guard.now();
                        let outcome = guard.cleanup_completed(now).await;
                        if !outcome.is_persisted() {
                            log::info!(
                                "cleanup removed {} tasks but {} saves failed",
                                outcome.value,
                                outcome.failures.len()
                            );
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }

            log::debug!("cleanup scheduler stopped");
        });

        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signals the loop to exit and waits for it. A run already in progress
    /// finishes first.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take()
            && let Err(err) = handle.await
        {
            log::warn!("cleanup scheduler ended abnormally: {err}");
        }
    }
}

impl Drop for CleanupScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CleanupScheduler;
    use crate::clock::ManualClock;
    use crate::storage::{COMPLETED_KEY, MemoryStore};
    use crate::store::{StorePolicy, TaskStore};
    use std::sync::Arc;
    use std::time::Duration;
    use time::macros::datetime;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn completed_blob() -> String {
        serde_json::json!([
            {
                "id": "old",
                "text": "old",
                "dueDate": "2026-09-01",
                "completedAt": "2026-09-10T08:00:00+07:00"
            },
            {
                "id": "fresh",
                "text": "fresh",
                "dueDate": "2026-10-01",
                "completedAt": "2026-10-10T08:00:00+07:00"
            }
        ])
        .to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_purges_expired_tasks() {
        let persistence = Arc::new(MemoryStore::new().with_blob(COMPLETED_KEY, completed_blob()));
        let clock = Arc::new(ManualClock::new(datetime!(2026-10-19 10:00 +7)));
        let store = TaskStore::open(persistence.clone(), clock, StorePolicy::default())
            .await
            .into_shared();

        let scheduler = CleanupScheduler::start(store.clone(), DAY);
        settle().await;

        let ids: Vec<String> = store
            .lock()
            .await
            .completed()
            .into_iter()
            .map(|entry| entry.task.id)
            .collect();
        assert_eq!(ids, vec!["fresh".to_string()]);
        assert!(!persistence.get(COMPLETED_KEY).unwrap().contains("\"old\""));

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn later_ticks_follow_the_period() {
        let persistence = Arc::new(MemoryStore::new().with_blob(COMPLETED_KEY, completed_blob()));
        let clock = Arc::new(ManualClock::new(datetime!(2026-10-19 10:00 +7)));
        let store = TaskStore::open(persistence.clone(), clock.clone(), StorePolicy::default())
            .await
            .into_shared();

        let scheduler = CleanupScheduler::start(store.clone(), DAY);
        settle().await;
        assert_eq!(store.lock().await.completed().len(), 1);

        // "fresh" expires once the clock passes 2026-11-09 08:00.
        clock.set(datetime!(2026-11-10 10:00 +7));
        tokio::time::sleep(DAY / 2).await;
        settle().await;
        assert_eq!(store.lock().await.completed().len(), 1);

        tokio::time::sleep(DAY / 2).await;
        settle().await;
        assert!(store.lock().await.completed().is_empty());

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_the_loop() {
        let persistence = Arc::new(MemoryStore::new().with_blob(COMPLETED_KEY, completed_blob()));
        let clock = Arc::new(ManualClock::new(datetime!(2026-09-20 10:00 +7)));
        let store = TaskStore::open(persistence.clone(), clock.clone(), StorePolicy::default())
            .await
            .into_shared();

        let scheduler = CleanupScheduler::start(store.clone(), DAY);
        settle().await;
        assert!(scheduler.is_running());
        scheduler.stop().await;

        clock.set(datetime!(2027-01-01 10:00 +7));
        tokio::time::sleep(DAY * 3).await;
        settle().await;

        assert_eq!(store.lock().await.completed().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_stop_still_runs_first_cleanup() {
        let persistence = Arc::new(MemoryStore::new().with_blob(COMPLETED_KEY, completed_blob()));
        let clock = Arc::new(ManualClock::new(datetime!(2026-10-19 10:00 +7)));
        let store = TaskStore::open(persistence.clone(), clock, StorePolicy::default())
            .await
            .into_shared();

        CleanupScheduler::start(store.clone(), DAY).stop().await;

        assert_eq!(store.lock().await.completed().len(), 1);
        assert_eq!(persistence.save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_scheduler_cancels_it() {
        let persistence = Arc::new(MemoryStore::new().with_blob(COMPLETED_KEY, completed_blob()));
        let clock = Arc::new(ManualClock::new(datetime!(2026-09-20 10:00 +7)));
        let store = TaskStore::open(persistence.clone(), clock.clone(), StorePolicy::default())
            .await
            .into_shared();

        let scheduler = CleanupScheduler::start(store.clone(), DAY);
        settle().await;
        drop(scheduler);

        clock.set(datetime!(2027-01-01 10:00 +7));
        tokio::time::sleep(DAY * 3).await;
        settle().await;

        assert_eq!(store.lock().await.completed().len(), 2);
    }
}

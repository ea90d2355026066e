//! Background retention sweeper.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tracing::{info, warn};

use cryptex_storage::Store;

/// Default retention window for soft-deleted rows.
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Default tick interval.
pub const DEFAULT_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(24 * 60 * 60);

/// Permanently erases soft-deleted projects and secrets once they have
/// been deleted for longer than the retention window.
///
/// Runs as a single long-lived task, serialized with itself: a tick
/// finishes (or fails) before the next timer fires. Secrets and projects
/// are purged independently; a partial sweep is self-healing because the
/// next tick retries with the same threshold rule.
pub struct RetentionSweeper {
    store: Arc<dyn Store>,
    retention: Duration,
    interval: StdDuration,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            retention: Duration::days(DEFAULT_RETENTION_DAYS),
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_interval(mut self, interval: StdDuration) -> Self {
        self.interval = interval;
        self
    }

    /// Tick loop; never returns. Spawn this on the runtime.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the first tick fires immediately; skip it so sweeps start one
        // full interval after startup
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.sweep_once().await;
        }
    }

    /// One purge pass over both entity types. Failures are logged and do
    /// not propagate; the next tick retries.
    pub async fn sweep_once(&self) {
        match self.store.purge_secrets(self.retention).await {
            Ok(purged) => {
                if purged > 0 {
                    info!(purged, "purged soft-deleted secrets past retention");
                }
            }
            Err(e) => warn!(error = %e, "secret purge failed; will retry next tick"),
        }

        match self.store.purge_projects(self.retention).await {
            Ok(purged) => {
                if purged > 0 {
                    info!(purged, "purged soft-deleted projects past retention");
                }
            }
            Err(e) => warn!(error = %e, "project purge failed; will retry next tick"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptex_storage::{
        ActorId, CreateProjectParams, CreateSecretParams, MockStore, StoreError,
    };
    use cryptex_store_sqlite::SqliteStore;
    use uuid::Uuid;

    async fn seeded_store() -> (Arc<SqliteStore>, cryptex_storage::ProjectId) {
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        let p = store
            .create_project(&CreateProjectParams {
                owner: ActorId(Uuid::now_v7()),
                name: "p".into(),
                description: None,
            })
            .await
            .unwrap();
        let s = store
            .create_secret(&CreateSecretParams {
                project_id: p.id,
                name: "k".into(),
                ciphertext: "blob".into(),
                version: 1,
                ttl_days: None,
                expires_at: None,
            })
            .await
            .unwrap();
        store.soft_delete_secret(&s.id).await.unwrap();
        store.soft_delete_project(&p.id).await.unwrap();
        (store, p.id)
    }

    #[tokio::test]
    async fn sweep_purges_past_retention() {
        let (store, project_id) = seeded_store().await;

        // fresh deletions survive the default window
        let sweeper = RetentionSweeper::new(store.clone());
        sweeper.sweep_once().await;
        assert!(store
            .get_latest_secret(&project_id, "k")
            .await
            .unwrap()
            .is_some());

        // a zero-length window erases them
        let sweeper = RetentionSweeper::new(store.clone())
            .with_retention(Duration::seconds(-1));
        sweeper.sweep_once().await;
        assert!(store
            .get_latest_secret(&project_id, "k")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn secret_purge_failure_does_not_skip_projects() {
        let mut mock = MockStore::new();
        mock.expect_purge_secrets()
            .times(1)
            .returning(|_| Err(StoreError::Backend("secrets table locked".into())));
        mock.expect_purge_projects().times(1).returning(|_| Ok(2));

        let sweeper = RetentionSweeper::new(Arc::new(mock));
        sweeper.sweep_once().await;
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_keeps_ticking_after_failures() {
        let mut mock = MockStore::new();
        mock.expect_purge_secrets()
            .times(2..)
            .returning(|_| Err(StoreError::Backend("down".into())));
        mock.expect_purge_projects().times(2..).returning(|_| Ok(0));

        let sweeper = RetentionSweeper::new(Arc::new(mock))
            .with_interval(StdDuration::from_secs(60));
        let task = tokio::spawn(sweeper.run());

        // paused clock: advancing fires ticks deterministically
        tokio::time::advance(StdDuration::from_secs(61)).await;
        tokio::task::yield_now().await;
        tokio::time::advance(StdDuration::from_secs(60)).await;
        tokio::task::yield_now().await;

        task.abort();
    }
}

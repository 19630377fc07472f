//! Expiry Sweep Task
//!
//! Background task that periodically removes expired offline records,
//! independent of connectivity.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::OfflineCache;

/// Spawns a background task that periodically sweeps expired records.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. A failed sweep is logged and retried on the next tick.
///
/// # Arguments
/// * `cache` - Shared offline cache
/// * `sweep_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let sweep_handle = spawn_sweep_task(cache.clone(), 3600);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(cache: Arc<OfflineCache>, sweep_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(sweep_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            sweep_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            // sweep_expired logs its own counts
            if let Err(e) = cache.sweep_expired().await {
                warn!("Expiry sweep failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::lifecycle::VLOG_TTL_MS;
    use crate::cache::CacheSettings;
    use crate::clock::{Clock, ManualClock};
    use crate::models::{PendingAction, Product, QaItem, Record, RecordPayload, Vlog};
    use crate::network::{Backend, NetworkError};
    use crate::store::Store;
    use async_trait::async_trait;

    struct OfflineBackend;

    #[async_trait]
    impl Backend for OfflineBackend {
        async fn probe(&self) -> Result<(), NetworkError> {
            Err(NetworkError::Timeout)
        }
        async fn fetch_vlogs(&self) -> Result<Vec<Vlog>, NetworkError> {
            Err(NetworkError::Timeout)
        }
        async fn fetch_products(&self) -> Result<Vec<Product>, NetworkError> {
            Err(NetworkError::Timeout)
        }
        async fn fetch_qa(&self) -> Result<Vec<QaItem>, NetworkError> {
            Err(NetworkError::Timeout)
        }
        async fn fetch_image(&self, _url: &str) -> Result<Vec<u8>, NetworkError> {
            Err(NetworkError::Timeout)
        }
        async fn replay(&self, _action: &PendingAction) -> Result<(), NetworkError> {
            Err(NetworkError::Timeout)
        }
    }

    fn setup() -> (Arc<OfflineCache>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let store = Store::in_memory(clock.clone() as Arc<dyn Clock>);
        let cache = OfflineCache::new(store, Arc::new(OfflineBackend), CacheSettings::default());
        (Arc::new(cache), clock)
    }

    fn vlog(id: &str) -> Vlog {
        Vlog {
            id: id.to_string(),
            title: "Try-on".to_string(),
            description: String::new(),
            thumbnail_url: None,
            video_url: None,
            published_at: None,
        }
    }

    async fn stored_ids(cache: &OfflineCache) -> Vec<String> {
        cache
            .store()
            .with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT id FROM records ORDER BY id")?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(ids)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_records() {
        let (cache, clock) = setup();
        cache.cache_vlogs(vec![vlog("1")]).await.unwrap();
        cache
            .put_one(Record::stamped(
                RecordPayload::Vlog(vlog("2")),
                VLOG_TTL_MS,
            ))
            .await
            .unwrap();

        clock.set(VLOG_TTL_MS + 1);
        let handle = spawn_sweep_task(cache.clone(), 1);

        // Wait for at least one sweep to run
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(stored_ids(&cache).await, ["vlog_2"]);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let (cache, _) = setup();

        let handle = spawn_sweep_task(cache, 1);

        // Abort immediately
        handle.abort();

        // Wait a bit and verify task is finished
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}

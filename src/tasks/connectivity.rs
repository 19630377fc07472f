//! Connectivity Monitor Task
//!
//! Probes the backend on a fixed interval and feeds the result into the
//! orchestrator, which reacts to offline/online transitions.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::tasks::Orchestrator;

/// Spawns the periodic connectivity probe.
///
/// The first probe runs after one interval; startup already probed once.
pub fn spawn_connectivity_monitor(
    orchestrator: Arc<Orchestrator>,
    interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting connectivity monitor with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;
            let online = orchestrator.check_connectivity().await;
            debug!("Connectivity check: online={}", online);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheSettings, OfflineCache};
    use crate::clock::{Clock, ManualClock};
    use crate::models::{ActionPayload, PendingAction, Product, QaItem, Vlog};
    use crate::network::{Backend, NetworkError};
    use crate::store::Store;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct SwitchBackend {
        up: AtomicBool,
        replays: AtomicUsize,
    }

    #[async_trait]
    impl Backend for SwitchBackend {
        async fn probe(&self) -> Result<(), NetworkError> {
            if self.up.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(NetworkError::Transport("connection refused".to_string()))
            }
        }
        async fn fetch_vlogs(&self) -> Result<Vec<Vlog>, NetworkError> {
            Ok(Vec::new())
        }
        async fn fetch_products(&self) -> Result<Vec<Product>, NetworkError> {
            Ok(Vec::new())
        }
        async fn fetch_qa(&self) -> Result<Vec<QaItem>, NetworkError> {
            Ok(Vec::new())
        }
        async fn fetch_image(&self, _url: &str) -> Result<Vec<u8>, NetworkError> {
            Err(NetworkError::Status { code: 404 })
        }
        async fn replay(&self, _action: &PendingAction) -> Result<(), NetworkError> {
            self.replays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_monitor_detects_reconnect_and_drains() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let backend = Arc::new(SwitchBackend::default());
        let cache = OfflineCache::new(
            Store::in_memory(clock),
            backend.clone(),
            CacheSettings::default(),
        );
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(cache),
            Duration::from_millis(100),
        ));
        orchestrator.start().await;
        assert!(!orchestrator.is_online());

        orchestrator
            .submit_action(ActionPayload::CartRemove {
                product_id: "p1".to_string(),
            })
            .await
            .unwrap();

        let handle = spawn_connectivity_monitor(orchestrator.clone(), 1);
        backend.up.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(orchestrator.is_online());
        assert_eq!(backend.replays.load(Ordering::SeqCst), 1);
        assert!(orchestrator.cache().outbox().is_empty().await.unwrap());

        handle.abort();
    }
}

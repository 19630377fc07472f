//! Pending-Action Outbox
//!
//! Durable FIFO of user mutations waiting for the network. An action stays
//! queued until a caller confirms it was replayed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::models::{ActionPayload, PendingAction};
use crate::store::{actions, Store};

#[derive(Debug, Clone)]
pub struct Outbox {
    store: Store,
    seq: Arc<AtomicU64>,
}

impl Outbox {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    // == Enqueue ==
    /// Persists a new action and returns it once durable.
    pub async fn enqueue(&self, payload: ActionPayload) -> Result<PendingAction> {
        let action = self.stage(payload)?;
        self.push(&action).await?;
        Ok(action)
    }

    /// Validates a payload and assigns its id and timestamp without
    /// persisting it.
    pub fn stage(&self, payload: ActionPayload) -> Result<PendingAction> {
        payload.validate()?;

        let queued_at = self.store.now_ms();
        let kind = payload.kind();
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        Ok(PendingAction {
            id: format!("{}_{}_{}_{}", kind, queued_at, payload.subject(), seq),
            kind,
            payload,
            queued_at,
        })
    }

    /// Persists an already staged action.
    pub async fn push(&self, action: &PendingAction) -> Result<()> {
        let stored = action.clone();
        self.store
            .with_conn(move |conn| actions::insert(conn, &stored))
            .await?;

        debug!("Queued {} action {}", action.kind, action.id);
        Ok(())
    }

    // == List Pending ==
    /// Queued actions in the order they were issued.
    pub async fn list_pending(&self) -> Result<Vec<PendingAction>> {
        self.store.with_conn(|conn| actions::list(conn)).await
    }

    // == Dequeue ==
    /// Removes one action after it was replayed. Returns false if it was
    /// already gone.
    pub async fn dequeue(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.store
            .with_conn(move |conn| actions::remove(conn, &id))
            .await
    }

    /// Drops actions queued before `cutoff_ms`.
    pub async fn prune_older_than(&self, cutoff_ms: i64) -> Result<usize> {
        let dropped = self
            .store
            .with_conn(move |conn| actions::remove_queued_before(conn, cutoff_ms))
            .await?;
        if dropped > 0 {
            info!("Dropped {} stale pending actions", dropped);
        }
        Ok(dropped)
    }

    pub async fn len(&self) -> Result<usize> {
        self.store.with_conn(|conn| actions::count(conn)).await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

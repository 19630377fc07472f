//! Outbox replay
//!
//! Replays queued actions one at a time, oldest first. A failure never stops
//! the drain; what happens to the failed action depends on whether the
//! backend can ever accept it.

use tracing::{info, warn};

use crate::cache::Outbox;
use crate::error::Result;
use crate::models::DrainReport;
use crate::network::Backend;

/// Attempts every queued action once, in order.
///
/// - success: the action is dequeued
/// - transient failure: the action stays queued for the next drain
/// - permanent rejection: the action is dropped and logged
pub async fn drain_outbox(outbox: &Outbox, backend: &dyn Backend) -> Result<DrainReport> {
    let pending = outbox.list_pending().await?;
    let mut report = DrainReport::default();
    if pending.is_empty() {
        return Ok(report);
    }

    info!("Replaying {} pending actions", pending.len());
    for action in pending {
        match backend.replay(&action).await {
            Ok(()) => {
                outbox.dequeue(&action.id).await?;
                report.replayed += 1;
            }
            Err(e) if e.is_permanent() => {
                warn!(
                    "Backend rejected {} action {}, dropping it: {}",
                    action.kind, action.id, e
                );
                outbox.dequeue(&action.id).await?;
                report.dead_lettered += 1;
            }
            Err(e) => {
                warn!(
                    "Replay of {} action {} failed, keeping it queued: {}",
                    action.kind, action.id, e
                );
                report.failed += 1;
            }
        }
    }

    info!(
        "Outbox drain finished: {} replayed, {} still queued, {} dropped",
        report.replayed, report.failed, report.dead_lettered
    );
    Ok(report)
}

//! Record Lifecycle
//!
//! Per-type time-to-live policy and the expiry sweep.

use tracing::{debug, info};

use crate::error::Result;
use crate::models::{Record, RecordPayload, RecordType};
use crate::store::{records, Store};

pub(crate) const DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub const VLOG_TTL_MS: i64 = 7 * DAY_MS;
pub const PRODUCT_TTL_MS: i64 = 14 * DAY_MS;
pub const QA_TTL_MS: i64 = 30 * DAY_MS;

/// Time-to-live assigned when a record of this type is written.
///
/// `None` means the record only goes away when deleted.
pub fn ttl_ms(record_type: RecordType) -> Option<i64> {
    match record_type {
        RecordType::Vlog => Some(VLOG_TTL_MS),
        RecordType::Product => Some(PRODUCT_TTL_MS),
        RecordType::Qa => Some(QA_TTL_MS),
        RecordType::UserData => None,
    }
}

impl Record {
    /// Wraps a payload written at `now_ms`, applying the TTL of its type.
    pub fn stamped(payload: RecordPayload, now_ms: i64) -> Self {
        let record_type = payload.record_type();
        Self {
            id: record_type.record_id(payload.source_id()),
            record_type,
            expires_at: ttl_ms(record_type).map(|ttl| now_ms + ttl),
            stored_at: now_ms,
            payload,
        }
    }
}

// == Sweep Expired ==
/// Deletes every record whose expiry has passed. Returns the number removed.
pub async fn sweep_expired(store: &Store) -> Result<usize> {
    let now = store.now_ms();
    let removed = store
        .with_conn(move |conn| records::delete_expired(conn, now))
        .await?;

    if removed > 0 {
        info!("Expiry sweep: removed {} expired records", removed);
    } else {
        debug!("Expiry sweep: no expired records found");
    }
    Ok(removed)
}

//! Pending-action partition operations.

use rusqlite::{params, Connection, Row};

use crate::error::Result;
use crate::models::PendingAction;

struct ActionRow {
    id: String,
    kind: String,
    payload: String,
    queued_at: i64,
}

impl ActionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            payload: row.get(2)?,
            queued_at: row.get(3)?,
        })
    }

    fn decode(self) -> Result<PendingAction> {
        Ok(PendingAction {
            kind: self.kind.parse()?,
            payload: serde_json::from_str(&self.payload)?,
            id: self.id,
            queued_at: self.queued_at,
        })
    }
}

/// Inserts a new action. An existing id is a constraint error, never an
/// overwrite.
pub(crate) fn insert(conn: &Connection, action: &PendingAction) -> Result<()> {
    let payload = serde_json::to_string(&action.payload)?;
    conn.execute(
        "INSERT INTO pending_actions (id, kind, payload, queued_at) VALUES (?1, ?2, ?3, ?4)",
        params![action.id, action.kind.as_str(), payload, action.queued_at],
    )?;
    Ok(())
}

/// All actions, oldest first; insertion order breaks timestamp ties.
pub(crate) fn list(conn: &Connection) -> Result<Vec<PendingAction>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, kind, payload, queued_at FROM pending_actions ORDER BY queued_at, seq",
    )?;
    let rows = stmt
        .query_map([], ActionRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(ActionRow::decode).collect()
}

pub(crate) fn remove(conn: &Connection, id: &str) -> Result<bool> {
    let removed = conn.execute("DELETE FROM pending_actions WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

pub(crate) fn remove_queued_before(conn: &Connection, cutoff_ms: i64) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM pending_actions WHERE queued_at < ?1",
        params![cutoff_ms],
    )?)
}

pub(crate) fn count(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM pending_actions", [], |row| {
        row.get(0)
    })?;
    Ok(count as usize)
}

pub(crate) fn total_bytes(conn: &Connection) -> Result<u64> {
    let bytes: i64 = conn.query_row(
        "SELECT COALESCE(SUM(LENGTH(CAST(id AS BLOB)) + LENGTH(CAST(kind AS BLOB))
                + LENGTH(CAST(payload AS BLOB))), 0)
         FROM pending_actions",
        [],
        |row| row.get(0),
    )?;
    Ok(bytes as u64)
}

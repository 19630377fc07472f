//! Record partition operations.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use super::Store;
use crate::error::Result;
use crate::models::record::is_expired;
use crate::models::{Record, RecordType};

const SELECT_RECORD: &str = "SELECT id, type, payload, stored_at, expires_at FROM records";

// == Record Row ==
/// A record as stored, before its payload is decoded.
#[derive(Debug)]
pub(crate) struct RecordRow {
    id: String,
    record_type: String,
    payload: String,
    stored_at: i64,
    expires_at: Option<i64>,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            record_type: row.get(1)?,
            payload: row.get(2)?,
            stored_at: row.get(3)?,
            expires_at: row.get(4)?,
        })
    }

    fn decode(self) -> Result<Record> {
        Ok(Record {
            record_type: self.record_type.parse()?,
            payload: serde_json::from_str(&self.payload)?,
            id: self.id,
            stored_at: self.stored_at,
            expires_at: self.expires_at,
        })
    }
}

// == Live Rows ==
/// Yields non-expired rows from a scan and sets expired ids aside.
///
/// Nothing is deleted while the scan is open; the caller purges the
/// collected ids once the iterator is dropped.
pub(crate) struct LiveRows<'a, I> {
    rows: I,
    now_ms: i64,
    stale: &'a mut Vec<String>,
}

impl<'a, I> LiveRows<'a, I> {
    pub(crate) fn new(rows: I, now_ms: i64, stale: &'a mut Vec<String>) -> Self {
        Self {
            rows,
            now_ms,
            stale,
        }
    }
}

impl<I> Iterator for LiveRows<'_, I>
where
    I: Iterator<Item = rusqlite::Result<RecordRow>>,
{
    type Item = rusqlite::Result<RecordRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.rows.next()? {
                Ok(row) if is_expired(row.expires_at, self.now_ms) => self.stale.push(row.id),
                other => return Some(other),
            }
        }
    }
}

// == Connection-level helpers ==
fn delete_logged(conn: &Connection, ids: &[String]) {
    for id in ids {
        if let Err(e) = conn.execute("DELETE FROM records WHERE id = ?1", params![id]) {
            warn!("Failed to purge expired record {}: {}", id, e);
        }
    }
    if !ids.is_empty() {
        debug!("Purged {} expired records on read", ids.len());
    }
}

pub(crate) fn delete_expired(conn: &Connection, now_ms: i64) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM records WHERE expires_at IS NOT NULL AND expires_at <= ?1",
        params![now_ms],
    )?)
}

pub(crate) fn total_bytes(conn: &Connection) -> Result<u64> {
    let bytes: i64 = conn.query_row(
        "SELECT COALESCE(SUM(LENGTH(CAST(id AS BLOB)) + LENGTH(CAST(payload AS BLOB))), 0)
         FROM records",
        [],
        |row| row.get(0),
    )?;
    Ok(bytes as u64)
}

// == Store record API ==
impl Store {
    // == Put ==
    /// Upserts a batch of records in one transaction.
    ///
    /// Either every record is committed or none is.
    pub async fn put(&self, records: Vec<Record>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT OR REPLACE INTO records (id, type, payload, stored_at, expires_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for record in &records {
                    record.validate()?;
                    let payload = serde_json::to_string(&record.payload)?;
                    stmt.execute(params![
                        record.id,
                        record.record_type.as_str(),
                        payload,
                        record.stored_at,
                        record.expires_at
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn put_one(&self, record: Record) -> Result<()> {
        self.put(vec![record]).await
    }

    // == Get ==
    /// Returns the record unless it is missing or expired.
    ///
    /// An expired record is deleted as a side effect; a failure of that
    /// delete is logged and does not fail the read.
    pub async fn get(&self, id: &str) -> Result<Option<Record>> {
        let id = id.to_string();
        let now = self.now_ms();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    &format!("{} WHERE id = ?1", SELECT_RECORD),
                    params![id],
                    RecordRow::from_row,
                )
                .optional()?;

            match row {
                None => Ok(None),
                Some(row) if is_expired(row.expires_at, now) => {
                    delete_logged(conn, &[row.id]);
                    Ok(None)
                }
                Some(row) => row.decode().map(Some),
            }
        })
        .await
    }

    // == Get By Type ==
    /// Scans the type index in `stored_at` order, returning at most `limit`
    /// live records. Expired rows met during the scan are purged afterwards.
    pub async fn get_by_type(
        &self,
        record_type: RecordType,
        limit: Option<usize>,
    ) -> Result<Vec<Record>> {
        let now = self.now_ms();
        self.with_conn(move |conn| {
            let mut stale = Vec::new();
            let live = {
                let mut stmt = conn.prepare_cached(&format!(
                    "{} WHERE type = ?1 ORDER BY stored_at, id",
                    SELECT_RECORD
                ))?;
                let rows = stmt.query_map(params![record_type.as_str()], RecordRow::from_row)?;
                let live = LiveRows::new(rows, now, &mut stale);
                match limit {
                    Some(n) => live.take(n).collect::<rusqlite::Result<Vec<_>>>()?,
                    None => live.collect::<rusqlite::Result<Vec<_>>>()?,
                }
            };
            delete_logged(conn, &stale);
            live.into_iter().map(RecordRow::decode).collect()
        })
        .await
    }

    // == Delete ==
    /// Removes a record; deleting a missing id is not an error.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM records WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
    }
}

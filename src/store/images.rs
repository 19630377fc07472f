//! Image partition operations.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

/// Size and recency of one cached image, as used by eviction planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMeta {
    pub url: String,
    pub size_bytes: u64,
    pub last_accessed_at: i64,
}

pub(crate) fn upsert(conn: &Connection, url: &str, data: &[u8], now_ms: i64) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO cached_images (url, data, size_bytes, last_accessed_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![url, data, data.len() as i64, now_ms],
    )?;
    Ok(())
}

pub(crate) fn fetch(conn: &Connection, url: &str) -> Result<Option<Vec<u8>>> {
    Ok(conn
        .query_row(
            "SELECT data FROM cached_images WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )
        .optional()?)
}

pub(crate) fn touch(conn: &Connection, url: &str, now_ms: i64) -> Result<()> {
    conn.execute(
        "UPDATE cached_images SET last_accessed_at = ?2 WHERE url = ?1",
        params![url, now_ms],
    )?;
    Ok(())
}

pub(crate) fn remove(conn: &Connection, url: &str) -> Result<()> {
    conn.execute("DELETE FROM cached_images WHERE url = ?1", params![url])?;
    Ok(())
}

/// Metadata of every image, least recently accessed first.
pub(crate) fn list_meta(conn: &Connection) -> Result<Vec<ImageMeta>> {
    let mut stmt = conn.prepare_cached(
        "SELECT url, size_bytes, last_accessed_at FROM cached_images
         ORDER BY last_accessed_at, url",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ImageMeta {
                url: row.get(0)?,
                size_bytes: row.get::<_, i64>(1)? as u64,
                last_accessed_at: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn total_bytes(conn: &Connection) -> Result<u64> {
    let bytes: i64 = conn.query_row(
        "SELECT COALESCE(SUM(size_bytes), 0) FROM cached_images",
        [],
        |row| row.get(0),
    )?;
    Ok(bytes as u64)
}

//! Schema for the three store partitions.
//!
//! Every statement is idempotent so reopening an existing database only
//! connects.

pub const SCHEMA: &str = r#"
-- General offline records
CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL,
    payload TEXT NOT NULL,
    stored_at INTEGER NOT NULL,
    expires_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_records_type ON records(type, stored_at);
CREATE INDEX IF NOT EXISTS idx_records_stored_at ON records(stored_at);
CREATE INDEX IF NOT EXISTS idx_records_expires_at ON records(expires_at);

-- Pending-action outbox; seq keeps insertion order for equal timestamps
CREATE TABLE IF NOT EXISTS pending_actions (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL,
    payload TEXT NOT NULL,
    queued_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pending_actions_queued ON pending_actions(queued_at, seq);
CREATE INDEX IF NOT EXISTS idx_pending_actions_kind ON pending_actions(kind);

-- Image blob cache
CREATE TABLE IF NOT EXISTS cached_images (
    url TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    size_bytes INTEGER NOT NULL,
    last_accessed_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cached_images_accessed ON cached_images(last_accessed_at);
CREATE INDEX IF NOT EXISTS idx_cached_images_size ON cached_images(size_bytes);
"#;

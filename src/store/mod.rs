//! Persistent Store
//!
//! A SQLite-backed, transactional key/value store with three partitions:
//! offline records, the pending-action outbox and the image cache.
//!
//! [`Store`] is a cheap `Clone` handle. The connection is opened lazily on
//! the first [`Store::init`] (or first operation); concurrent callers share
//! the same in-flight initialization, so the underlying [`StoreOpener`] runs
//! once.

pub(crate) mod actions;
pub(crate) mod images;
pub(crate) mod records;
mod schema;

use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::clock::Clock;
use crate::error::{CacheError, Result};

// == Store Opener ==
/// Opens the raw connection backing a [`Store`].
pub trait StoreOpener: Send + Sync + Debug {
    fn open(&self) -> Result<Connection>;
}

/// Opens a SQLite database file, or a private in-memory database.
#[derive(Debug, Clone)]
pub enum SqliteOpener {
    File(PathBuf),
    Memory,
}

impl StoreOpener for SqliteOpener {
    fn open(&self) -> Result<Connection> {
        match self {
            SqliteOpener::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        CacheError::StoreUnavailable(format!(
                            "Failed to create store directory {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
                Connection::open(path).map_err(|e| {
                    CacheError::StoreUnavailable(format!(
                        "Failed to open store at {}: {}",
                        path.display(),
                        e
                    ))
                })
            }
            SqliteOpener::Memory => Connection::open_in_memory()
                .map_err(|e| CacheError::StoreUnavailable(e.to_string())),
        }
    }
}

// == Database ==
struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    fn open(opener: &dyn StoreOpener) -> Result<Self> {
        let conn = opener.open()?;
        conn.execute_batch(schema::SCHEMA).map_err(|e| {
            CacheError::StoreUnavailable(format!("Failed to create partitions: {}", e))
        })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

// == Store ==
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    opener: Arc<dyn StoreOpener>,
    db: OnceCell<Arc<Database>>,
    clock: Arc<dyn Clock>,
}

impl Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("opener", &self.inner.opener)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Store {
    pub fn new(opener: impl StoreOpener + 'static, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                opener: Arc::new(opener),
                db: OnceCell::new(),
                clock,
            }),
        }
    }

    pub fn open_path(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self::new(SqliteOpener::File(path.into()), clock)
    }

    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(SqliteOpener::Memory, clock)
    }

    // == Init ==
    /// Opens the connection and creates the partitions if needed.
    ///
    /// Idempotent. A failed initialization leaves the store uninitialized and
    /// the error is returned to every caller that was waiting on it.
    pub async fn init(&self) -> Result<()> {
        self.database().await.map(|_| ())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.db.initialized()
    }

    pub fn now_ms(&self) -> i64 {
        self.inner.clock.now_ms()
    }

    async fn database(&self) -> Result<Arc<Database>> {
        let db = self
            .inner
            .db
            .get_or_try_init(|| async {
                let opener = Arc::clone(&self.inner.opener);
                let opened = tokio::task::spawn_blocking(move || Database::open(opener.as_ref()))
                    .await
                    .map_err(|e| CacheError::Internal(format!("Store open task failed: {}", e)))?;
                match opened {
                    Ok(db) => {
                        info!("Offline store opened");
                        Ok(Arc::new(db))
                    }
                    Err(e) => {
                        error!("Offline store unavailable: {}", e);
                        Err(e)
                    }
                }
            })
            .await?;
        Ok(Arc::clone(db))
    }

    // == With Connection ==
    /// Runs `f` against the connection on the blocking pool.
    pub(crate) async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.database().await?;
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .conn
                .lock()
                .map_err(|_| CacheError::Internal("Store connection lock poisoned".to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| CacheError::Internal(format!("Store task failed: {}", e)))?
    }
}

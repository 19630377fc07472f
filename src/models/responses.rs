//! Response DTOs and operation reports
//!
//! Reports are returned by cache operations and serialized as-is by the
//! status API.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::models::{PendingAction, Record};

/// Byte usage per partition (GET /storage)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageSize {
    pub offline_data: u64,
    pub pending_actions: u64,
    pub cached_images: u64,
    pub total: u64,
}

impl StorageSize {
    pub fn new(offline_data: u64, pending_actions: u64, cached_images: u64) -> Self {
        Self {
            offline_data,
            pending_actions,
            cached_images,
            total: offline_data + pending_actions + cached_images,
        }
    }
}

/// Outcome of one cache maintenance pass (POST /optimize)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OptimizeReport {
    pub expired_records: usize,
    pub evicted_images: usize,
    pub dropped_actions: usize,
}

/// Outcome of one outbox drain (POST /pending/drain)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Actions replayed and removed
    pub replayed: usize,
    /// Actions that failed transiently and stay queued
    pub failed: usize,
    /// Actions the backend rejected permanently and were dropped
    pub dead_lettered: usize,
    /// True when another drain was already running
    pub skipped: bool,
}

impl DrainReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Image cache statistics (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
        }
    }
}

/// Orchestrator state (GET /status)
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub lifecycle: String,
    pub online: bool,
    pub degraded: bool,
}

/// Response body for GET /records
#[derive(Debug, Clone, Serialize)]
pub struct RecordsResponse {
    pub count: usize,
    pub records: Vec<Record>,
}

impl RecordsResponse {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            count: records.len(),
            records,
        }
    }
}

/// Response body for GET /pending
#[derive(Debug, Clone, Serialize)]
pub struct PendingResponse {
    pub count: usize,
    pub actions: Vec<PendingAction>,
}

impl PendingResponse {
    pub fn new(actions: Vec<PendingAction>) -> Self {
        Self {
            count: actions.len(),
            actions,
        }
    }
}

/// Response body for POST /actions
#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    /// "sent" when replayed immediately, "queued" when stored for later
    pub outcome: String,
    pub action_id: Option<String>,
}

/// Response body for POST /images
#[derive(Debug, Clone, Serialize)]
pub struct CachedImageResponse {
    pub url: String,
    /// Older images evicted to make room
    pub evicted: usize,
}

/// Response body for DELETE /records/:id
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub id: String,
}

impl DeleteResponse {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            message: format!("Record '{}' deleted", id),
            id,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

//! API Handlers
//!
//! HTTP request handlers for the local status surface.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::{ImageSource, OfflineCache};
use crate::error::{CacheError, Result};
use crate::models::{
    ActionPayload, CachedImageResponse, DeleteResponse, DrainReport, HealthResponse, ImageRequest,
    ListRecordsQuery, OptimizeReport, PendingResponse, Record, RecordsResponse, StatsResponse,
    StatusResponse, StorageSize, SubmitResponse,
};
use crate::tasks::Orchestrator;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn cache(&self) -> &OfflineCache {
        self.orchestrator.cache()
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /status
///
/// Lifecycle state, connectivity and whether the store is bypassed.
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.orchestrator.status())
}

/// Handler for GET /storage
pub async fn storage_handler(State(state): State<AppState>) -> Result<Json<StorageSize>> {
    Ok(Json(state.cache().get_storage_size().await?))
}

/// Handler for GET /stats
///
/// Image cache hit/miss/eviction counters.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache().image_stats()))
}

/// Handler for GET /records?type=..&limit=..
pub async fn list_records_handler(
    State(state): State<AppState>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<RecordsResponse>> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let records = state
        .cache()
        .get_by_type(query.record_type, query.limit)
        .await?;
    Ok(Json(RecordsResponse::new(records)))
}

/// Handler for GET /records/:id
///
/// Expired records are reported as missing.
pub async fn get_record_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Record>> {
    state
        .cache()
        .get(&id)
        .await?
        .map(Json)
        .ok_or(CacheError::NotFound(id))
}

/// Handler for DELETE /records/:id
///
/// Deleting a missing record succeeds.
pub async fn delete_record_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.cache().delete(&id).await?;
    Ok(Json(DeleteResponse::new(id)))
}

/// Handler for GET /pending
pub async fn pending_handler(State(state): State<AppState>) -> Result<Json<PendingResponse>> {
    let actions = state.cache().list_pending_actions().await?;
    Ok(Json(PendingResponse::new(actions)))
}

/// Handler for POST /pending/drain
pub async fn drain_handler(State(state): State<AppState>) -> Result<Json<DrainReport>> {
    Ok(Json(state.cache().drain_pending_actions().await?))
}

/// Handler for POST /actions
///
/// Sends the action if online, otherwise queues it.
pub async fn submit_action_handler(
    State(state): State<AppState>,
    Json(payload): Json<ActionPayload>,
) -> Result<Json<SubmitResponse>> {
    let outcome = state.orchestrator.submit_action(payload).await?;
    Ok(Json(SubmitResponse {
        outcome: outcome.as_str().to_string(),
        action_id: Some(outcome.action().id.clone()),
    }))
}

/// Handler for GET /images?url=..
///
/// Cached bytes as a `data:` URL, or the remote URL on a miss.
pub async fn image_handler(
    State(state): State<AppState>,
    Query(req): Query<ImageRequest>,
) -> Result<Json<ImageSource>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    Ok(Json(state.cache().get_cached_image_url(&req.url).await))
}

/// Handler for POST /images
///
/// Fetches the image through the backend and caches it.
pub async fn cache_image_handler(
    State(state): State<AppState>,
    Json(req): Json<ImageRequest>,
) -> Result<Json<CachedImageResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let evicted = state.cache().cache_image(&req.url).await?;
    Ok(Json(CachedImageResponse {
        url: req.url,
        evicted,
    }))
}

/// Handler for POST /optimize
pub async fn optimize_handler(State(state): State<AppState>) -> Result<Json<OptimizeReport>> {
    Ok(Json(state.cache().optimize_cache().await?))
}

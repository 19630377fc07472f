//! API Routes
//!
//! Configures the Axum router for the local status surface.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_image_handler, delete_record_handler, drain_handler, get_record_handler,
    health_handler, image_handler, list_records_handler, optimize_handler, pending_handler,
    stats_handler, status_handler, storage_handler, submit_action_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /status` - Lifecycle, connectivity and degraded flag
/// - `GET /storage` - Byte usage per partition
/// - `GET /stats` - Image cache statistics
/// - `GET /records?type=&limit=` - Live records of one type
/// - `GET /records/:id` - One record
/// - `DELETE /records/:id` - Delete a record
/// - `GET /pending` - Queued actions
/// - `POST /pending/drain` - Replay the outbox now
/// - `POST /actions` - Submit a user action
/// - `GET /images?url=` - Cached image as a data URL, or the remote URL
/// - `POST /images` - Fetch and cache an image
/// - `POST /optimize` - Expiry sweep, LRU enforcement and outbox pruning
///
/// # Middleware
/// - CORS: Allows any origin (the status screen is served separately)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/storage", get(storage_handler))
        .route("/stats", get(stats_handler))
        .route("/records", get(list_records_handler))
        .route(
            "/records/:id",
            get(get_record_handler).delete(delete_record_handler),
        )
        .route("/pending", get(pending_handler))
        .route("/pending/drain", post(drain_handler))
        .route("/actions", post(submit_action_handler))
        .route("/images", get(image_handler).post(cache_image_handler))
        .route("/optimize", post(optimize_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

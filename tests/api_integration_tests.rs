//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint against an in-memory
//! store and a scripted backend.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use offline_cache::{
    cache::CacheSettings,
    clock::{Clock, ManualClock},
    create_router,
    models::{PendingAction, Product, QaItem, Vlog},
    AppState, Backend, NetworkError, OfflineCache, Orchestrator, Store,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

// == Helper Functions ==

const PNG: [u8; 6] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A];

/// Serves one vlog, one product and PNG images; reachability can be toggled.
struct StorefrontBackend {
    up: AtomicBool,
}

#[async_trait]
impl Backend for StorefrontBackend {
    async fn probe(&self) -> Result<(), NetworkError> {
        if self.up.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(NetworkError::Transport("offline".to_string()))
        }
    }

    async fn fetch_vlogs(&self) -> Result<Vec<Vlog>, NetworkError> {
        Ok(vec![Vlog {
            id: "1".to_string(),
            title: "Spring lookbook".to_string(),
            description: "Three outfits".to_string(),
            thumbnail_url: Some("https://cdn.test/vlog1.png".to_string()),
            video_url: None,
            published_at: None,
        }])
    }

    async fn fetch_products(&self) -> Result<Vec<Product>, NetworkError> {
        Ok(vec![Product {
            id: "42".to_string(),
            name: "Linen shirt".to_string(),
            price: 5_900,
            image_url: Some("https://cdn.test/shirt.png".to_string()),
            category: "tops".to_string(),
            in_stock: true,
        }])
    }

    async fn fetch_qa(&self) -> Result<Vec<QaItem>, NetworkError> {
        Err(NetworkError::Status { code: 500 })
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        if url.ends_with(".png") {
            Ok(PNG.to_vec())
        } else {
            Err(NetworkError::Status { code: 404 })
        }
    }

    async fn replay(&self, _action: &PendingAction) -> Result<(), NetworkError> {
        if self.up.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(NetworkError::Transport("offline".to_string()))
        }
    }
}

async fn create_test_app(online: bool) -> Router {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(1_700_000_000_000));
    let backend = Arc::new(StorefrontBackend {
        up: AtomicBool::new(online),
    });
    let cache = OfflineCache::new(Store::in_memory(clock), backend, CacheSettings::default());
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(cache),
        Duration::from_millis(100),
    ));
    orchestrator.start().await;
    create_router(AppState::new(orchestrator))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// == Status Endpoint Tests ==

#[tokio::test]
async fn test_status_after_online_start() {
    let app = create_test_app(true).await;

    let response = app.oneshot(get("/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["lifecycle"], "ready");
    assert_eq!(json["online"], true);
    assert_eq!(json["degraded"], false);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(false).await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Records Endpoint Tests ==

#[tokio::test]
async fn test_populated_records_are_listed() {
    let app = create_test_app(true).await;

    let response = app
        .clone()
        .oneshot(get("/records?type=product"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["records"][0]["id"], "product_42");
    assert_eq!(json["records"][0]["payload"]["type"], "product");

    // The failing Q&A source did not stop the others
    let response = app.oneshot(get("/records?type=qa")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn test_get_and_delete_record() {
    let app = create_test_app(true).await;

    let response = app.clone().oneshot(get("/records/vlog_1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["record_type"], "vlog");
    assert!(json["expires_at"].is_i64());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/records/vlog_1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/records/vlog_1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("vlog_1"));
}

#[tokio::test]
async fn test_list_records_limit_validation() {
    let app = create_test_app(false).await;

    let response = app
        .oneshot(get("/records?type=vlog&limit=0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == Actions Endpoint Tests ==

#[tokio::test]
async fn test_actions_queue_while_offline() {
    let app = create_test_app(false).await;

    for product in ["a", "b"] {
        let body = format!(r#"{{"kind":"cart_remove","product_id":"{}"}}"#, product);
        let response = app
            .clone()
            .oneshot(post_json("/actions", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_to_json(response.into_body()).await;
        assert_eq!(json["outcome"], "queued");
    }

    let response = app.clone().oneshot(get("/pending")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["actions"][0]["payload"]["product_id"], "a");
    assert_eq!(json["actions"][1]["payload"]["product_id"], "b");

    let response = app.oneshot(post_json("/pending/drain", "")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["failed"], 2);
    assert_eq!(json["replayed"], 0);
}

#[tokio::test]
async fn test_actions_sent_while_online() {
    let app = create_test_app(true).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/actions",
            r#"{"kind":"qa_submit","question":"Does it shrink?","category":"care"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["outcome"], "sent");

    let response = app.oneshot(get("/pending")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn test_invalid_action_rejected() {
    let app = create_test_app(false).await;

    let response = app
        .oneshot(post_json(
            "/actions",
            r#"{"kind":"cart_add","product_id":"p1","quantity":0}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app(false).await;

    let response = app
        .oneshot(post_json("/actions", "not json"))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

// == Image Endpoint Tests ==

#[tokio::test]
async fn test_cache_and_read_image() {
    let app = create_test_app(true).await;

    let response = app
        .clone()
        .oneshot(post_json("/images", r#"{"url":"https://cdn.test/shirt.png"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/images?url=https%3A%2F%2Fcdn.test%2Fshirt.png"))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["source"], "cached");
    assert!(json["data_url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));

    let response = app.oneshot(get("/stats")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"], 1);
}

#[tokio::test]
async fn test_image_fetch_failure_is_bad_gateway() {
    let app = create_test_app(true).await;

    let response = app
        .oneshot(post_json("/images", r#"{"url":"https://cdn.test/missing.jpg"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_image_miss_falls_back_to_remote() {
    let app = create_test_app(false).await;

    let response = app
        .oneshot(get("/images?url=https%3A%2F%2Fcdn.test%2Fnew.png"))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["source"], "remote");
    assert_eq!(json["url"], "https://cdn.test/new.png");
}

// == Maintenance Endpoint Tests ==

#[tokio::test]
async fn test_storage_reports_partitions() {
    let app = create_test_app(true).await;

    let response = app.oneshot(get("/storage")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;

    let offline_data = json["offline_data"].as_u64().unwrap();
    assert!(offline_data > 0);
    assert_eq!(json["pending_actions"], 0);
    assert_eq!(json["cached_images"], 0);
    assert_eq!(json["total"].as_u64().unwrap(), offline_data);
}

#[tokio::test]
async fn test_optimize_endpoint() {
    let app = create_test_app(true).await;

    let response = app.oneshot(post_json("/optimize", "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["expired_records"], 0);
    assert_eq!(json["evicted_images"], 0);
    assert_eq!(json["dropped_actions"], 0);
}

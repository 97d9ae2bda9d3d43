//! Shared helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use postframe_api::config::ServerConfig;
use postframe_api::router::build_app_router;
use postframe_api::state::AppState;
use postframe_core::dispatch::DispatchMode;
use postframe_core::retry::RetryPolicy;
use postframe_core::types::DbId;
use postframe_db::models::customer::CreateCustomer;
use postframe_db::models::customer_group::CreateCustomerGroup;
use postframe_db::models::event::CreateEvent;
use postframe_db::models::post::CreatePost;
use postframe_db::repositories::{CustomerGroupRepo, CustomerRepo, EventRepo, PostRepo};
use postframe_events::EventBus;
use postframe_pipeline::{ActionExecutor, PipelineConfig, TriggerDispatcher};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        shutdown_timeout_secs: 5,
        ..ServerConfig::default()
    }
}

/// Build the full application router over `pool`, through the same
/// `build_app_router` the binary uses.
///
/// Dispatch is inline, so mapping rows exist once a request returns.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_bus(pool, DispatchMode::Inline, Arc::new(EventBus::default()))
}

pub fn build_test_app_with_bus(pool: PgPool, mode: DispatchMode, bus: Arc<EventBus>) -> Router {
    let config = test_config();
    let pipeline_config = PipelineConfig {
        batch_retry: RetryPolicy::no_retry(),
        ..PipelineConfig::default()
    }
    .with_mode(mode);
    let executor = Arc::new(ActionExecutor::new(
        pool.clone(),
        &pipeline_config,
        Some(Arc::clone(&bus)),
    ));
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        dispatcher: Arc::new(TriggerDispatcher::new(executor, &pipeline_config)),
        event_bus: bus,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response {
    app.oneshot(Request::post(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    send_json(app, "POST", uri, body).await
}

pub async fn patch_json(app: Router, uri: &str, body: Value) -> Response {
    send_json(app, "PATCH", uri, body).await
}

async fn send_json(app: Router, method: &str, uri: &str, body: Value) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Assert the status and return the JSON body.
pub async fn expect_json(response: Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn group(pool: &PgPool, name: &str) -> DbId {
    CustomerGroupRepo::create(pool, &CreateCustomerGroup { name: name.to_string() })
        .await
        .unwrap()
        .id
}

pub async fn customer(pool: &PgPool, username: &str, no_of_post: i32) -> DbId {
    CustomerRepo::create(
        pool,
        &CreateCustomer {
            username: username.to_string(),
            whatsapp_number: format!("+91{username}"),
            no_of_post: Some(no_of_post),
        },
    )
    .await
    .unwrap()
    .id
}

/// An event dated a week from today.
pub async fn upcoming_event(pool: &PgPool, name: &str) -> DbId {
    let date = chrono::Utc::now().date_naive() + chrono::Days::new(7);
    EventRepo::create(
        pool,
        &CreateEvent {
            name: name.to_string(),
            event_date: Some(date),
            media_type: None,
        },
    )
    .await
    .unwrap()
    .id
}

/// Insert a post without reporting the save.
pub async fn post(pool: &PgPool, event_id: DbId, group_id: DbId) -> DbId {
    PostRepo::create(
        pool,
        &CreatePost {
            event_id,
            group_id: Some(group_id),
            media_type: None,
            file_path: format!("posts/{event_id}-{group_id}.png"),
        },
    )
    .await
    .unwrap()
    .id
}

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use common::*;
use postframe_core::dispatch::DispatchMode;
use postframe_core::trigger::EntityType;
use postframe_events::{EventBus, PlatformEvent};
use serde_json::json;
use sqlx::PgPool;

async fn frame_via_api(pool: &PgPool, username: &str, group_id: i64) -> i64 {
    let customer_id = customer(pool, username, 5).await;
    let app = build_test_app(pool.clone());
    let body = json!({
        "customer_id": customer_id,
        "group_id": group_id,
        "frame_image": "frames/a.png",
    });
    let json = expect_json(post_json(app, "/api/v1/frames", body).await, StatusCode::CREATED).await;
    json["data"]["frame"]["id"].as_i64().unwrap()
}

// ---- Test: inline dispatch returns the report ----

#[sqlx::test(migrations = "../../db/migrations")]
async fn saved_post_is_mapped_before_response(pool: PgPool) {
    let g = group(&pool, "Retail").await;
    frame_via_api(&pool, "alice", g).await;
    frame_via_api(&pool, "bob", g).await;
    let event_id = upcoming_event(&pool, "Diwali").await;
    let post_id = post(&pool, event_id, g).await;

    let app = build_test_app(pool.clone());
    let body = json!({"entity_type": "post", "entity_id": post_id, "is_new": true});
    let json = expect_json(
        post_json(app, "/api/v1/hooks/entity-saved", body).await,
        StatusCode::OK,
    )
    .await;

    let actions = json["data"]["actions"].as_array().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["action"]["action"], "map_post");
    assert_eq!(actions[0]["status"], "inline");
    assert_eq!(actions[0]["outcome"]["materialized"]["post"]["created"], 2);

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM customer_post_frame_mappings WHERE post_id = $1",
    )
    .bind(post_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn repeated_save_creates_nothing(pool: PgPool) {
    let g = group(&pool, "Retail").await;
    frame_via_api(&pool, "alice", g).await;
    let event_id = upcoming_event(&pool, "Holi").await;
    let post_id = post(&pool, event_id, g).await;
    let body = json!({"entity_type": "post", "entity_id": post_id, "is_new": true});

    let first = post_json(build_test_app(pool.clone()), "/api/v1/hooks/entity-saved", body.clone());
    assert_eq!(first.await.status(), StatusCode::OK);

    let app = build_test_app(pool.clone());
    let json = expect_json(
        post_json(app, "/api/v1/hooks/entity-saved", body).await,
        StatusCode::OK,
    )
    .await;
    let outcome = &json["data"]["actions"][0]["outcome"]["materialized"]["post"];
    assert_eq!(outcome["created"], 0);
    assert_eq!(outcome["updated"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_without_relevant_change_plans_nothing(pool: PgPool) {
    let app = build_test_app(pool);
    let body = json!({
        "entity_type": "other_post",
        "entity_id": 9,
        "is_new": false,
        "changed_fields": ["name"],
    });
    let json = expect_json(
        post_json(app, "/api/v1/hooks/entity-saved", body).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["actions"], json!([]));
}

// ---- Test: queued dispatch ----

#[sqlx::test(migrations = "../../db/migrations")]
async fn queued_mode_returns_job_ids(pool: PgPool) {
    let g = group(&pool, "Retail").await;
    let event_id = upcoming_event(&pool, "Pongal").await;
    let post_id = post(&pool, event_id, g).await;

    let app = build_test_app_with_bus(
        pool.clone(),
        DispatchMode::Queued,
        Arc::new(EventBus::default()),
    );
    let body = json!({"entity_type": "post", "entity_id": post_id, "is_new": true});
    let json = expect_json(
        post_json(app, "/api/v1/hooks/entity-saved", body).await,
        StatusCode::OK,
    )
    .await;

    let action = &json["data"]["actions"][0];
    assert_eq!(action["status"], "queued");
    let job_id = action["job_id"].as_i64().unwrap();

    let app = build_test_app(pool);
    let job = expect_json(
        get(app, &format!("/api/v1/mapping-jobs/{job_id}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(job["data"]["action_name"], "map_post");
    assert_eq!(job["data"]["action"]["post_id"], post_id);
}

// ---- Test: fire-and-forget ----

#[sqlx::test(migrations = "../../db/migrations")]
async fn no_wait_publishes_to_the_bus(pool: PgPool) {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let app = build_test_app_with_bus(pool, DispatchMode::Inline, Arc::clone(&bus));

    let body = json!({"entity_type": "customer_frame", "entity_id": 4, "is_new": true});
    let response = post_json(app, "/api/v1/hooks/entity-saved?wait=false", body).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_matches!(received, PlatformEvent::EntitySaved(event) => {
        assert_eq!(event.entity_type, EntityType::CustomerFrame);
        assert_eq!(event.entity_id, 4);
    });
}

// ---- Test: malformed payloads ----

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_entity_type_is_rejected(pool: PgPool) {
    let app = build_test_app(pool);
    let body = json!({"entity_type": "story", "entity_id": 1, "is_new": true});
    let response = post_json(app, "/api/v1/hooks/entity-saved", body).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

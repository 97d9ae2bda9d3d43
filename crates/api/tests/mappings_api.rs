mod common;

use axum::http::StatusCode;
use common::*;
use postframe_core::types::DbId;
use serde_json::json;
use sqlx::PgPool;

/// One customer with one frame mapped to one upcoming post.
async fn mapped_world(pool: &PgPool) -> (DbId, DbId, DbId) {
    let g = group(pool, "Retail").await;
    let event_id = upcoming_event(pool, "Diwali").await;
    let post_id = post(pool, event_id, g).await;
    let customer_id = customer(pool, "alice", 3).await;
    let body = json!({"customer_id": customer_id, "group_id": g, "frame_image": "frames/a.png"});
    let created = expect_json(
        post_json(build_test_app(pool.clone()), "/api/v1/frames", body).await,
        StatusCode::CREATED,
    )
    .await;
    let frame_id = created["data"]["frame"]["id"].as_i64().unwrap();
    (customer_id, frame_id, post_id)
}

async fn group_of(pool: &PgPool, frame_id: DbId) -> DbId {
    sqlx::query_scalar("SELECT group_id FROM customer_frames WHERE id = $1")
        .bind(frame_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

// ---- Test: lookup ----

#[sqlx::test(migrations = "../../db/migrations")]
async fn finds_mapping_by_customer_and_post(pool: PgPool) {
    let (customer_id, frame_id, post_id) = mapped_world(&pool).await;

    let uri = format!("/api/v1/mappings/post?customer_id={customer_id}&post_id={post_id}");
    let json = expect_json(get(build_test_app(pool), &uri).await, StatusCode::OK).await;
    assert_eq!(json["data"]["customer_frame_id"], frame_id);
    assert_eq!(json["data"]["post_id"], post_id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn frame_id_narrows_lookup_for_multi_frame_customer(pool: PgPool) {
    let (customer_id, first_frame, post_id) = mapped_world(&pool).await;
    let body = json!({
        "customer_id": customer_id,
        "group_id": group_of(&pool, first_frame).await,
        "frame_image": "frames/b.png",
        "display_name": "Second shop"
    });
    let created = expect_json(
        post_json(build_test_app(pool.clone()), "/api/v1/frames", body).await,
        StatusCode::CREATED,
    )
    .await;
    let second_frame = created["data"]["frame"]["id"].as_i64().unwrap();

    let base = format!("/api/v1/mappings/post?customer_id={customer_id}&post_id={post_id}");
    for frame_id in [first_frame, second_frame] {
        let uri = format!("{base}&frame_id={frame_id}");
        let json = expect_json(get(build_test_app(pool.clone()), &uri).await, StatusCode::OK).await;
        assert_eq!(json["data"]["customer_frame_id"], frame_id);
    }

    let json = expect_json(get(build_test_app(pool.clone()), &base).await, StatusCode::OK).await;
    assert_eq!(json["data"]["customer_frame_id"], first_frame);

    let uri = format!("{base}&frame_id=999999");
    expect_json(get(build_test_app(pool), &uri).await, StatusCode::NOT_FOUND).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unmapped_post_is_404(pool: PgPool) {
    let (customer_id, _, _) = mapped_world(&pool).await;

    let uri = format!("/api/v1/mappings/other_post?customer_id={customer_id}&post_id=1");
    let json = expect_json(get(build_test_app(pool), &uri).await, StatusCode::NOT_FOUND).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_kind_is_400(pool: PgPool) {
    let json = expect_json(
        get(build_test_app(pool), "/api/v1/mappings/story?customer_id=1&post_id=1").await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

// ---- Test: download flag ----

#[sqlx::test(migrations = "../../db/migrations")]
async fn mark_downloaded_is_idempotent(pool: PgPool) {
    let (customer_id, _, _) = mapped_world(&pool).await;
    let list_uri = format!("/api/v1/customers/{customer_id}/mappings/post");
    let listed = expect_json(get(build_test_app(pool.clone()), &list_uri).await, StatusCode::OK).await;
    let mapping_id = listed["data"][0]["id"].as_i64().unwrap();

    let uri = format!("/api/v1/mappings/post/{mapping_id}/downloaded");
    for _ in 0..2 {
        let json = expect_json(post_empty(build_test_app(pool.clone()), &uri).await, StatusCode::OK).await;
        assert_eq!(json["data"]["is_downloaded"], true);
    }

    let pending = expect_json(
        get(build_test_app(pool.clone()), &format!("{list_uri}?is_downloaded=false")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(pending["data"], json!([]));

    let done = expect_json(
        get(build_test_app(pool), &format!("{list_uri}?is_downloaded=true")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(done["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn marking_missing_mapping_is_404(pool: PgPool) {
    let response = post_empty(build_test_app(pool), "/api/v1/mappings/business_post/77/downloaded").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn customer_without_mappings_lists_empty(pool: PgPool) {
    let customer_id = customer(&pool, "bob", 1).await;
    let uri = format!("/api/v1/customers/{customer_id}/mappings/business_post");
    let json = expect_json(get(build_test_app(pool), &uri).await, StatusCode::OK).await;
    assert_eq!(json["data"], json!([]));
}

//! Shared fixtures for pipeline integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Days, Utc};
use postframe_core::dispatch::DispatchMode;
use postframe_core::mapping::MappingKind;
use postframe_core::retry::RetryPolicy;
use postframe_core::types::{Date, DbId};
use postframe_db::models::category::{CreateBusinessCategory, CreateCategory};
use postframe_db::models::customer::CreateCustomer;
use postframe_db::models::customer_frame::{CreateCustomerFrame, CustomerFrame};
use postframe_db::models::customer_group::CreateCustomerGroup;
use postframe_db::models::event::CreateEvent;
use postframe_db::models::post::{CreateBusinessPost, CreateOtherPost, CreatePost};
use postframe_db::repositories::{
    BusinessPostRepo, CategoryRepo, CustomerFrameRepo, CustomerGroupRepo, CustomerRepo, EventRepo,
    MappingRepo, OtherPostRepo, PostRepo,
};
use postframe_pipeline::{ActionExecutor, PipelineConfig, TriggerDispatcher};
use sqlx::PgPool;

pub fn today() -> Date {
    Utc::now().date_naive()
}

pub fn days_from_today(days: i64) -> Date {
    if days >= 0 {
        today() + Days::new(days as u64)
    } else {
        today() - Days::new(days.unsigned_abs())
    }
}

/// Config without batch retries, so failures surface immediately.
pub fn config(mode: DispatchMode) -> PipelineConfig {
    PipelineConfig {
        batch_retry: RetryPolicy::no_retry(),
        ..PipelineConfig::default()
    }
    .with_mode(mode)
}

pub fn dispatcher(pool: &PgPool, mode: DispatchMode) -> TriggerDispatcher {
    let config = config(mode);
    let executor = Arc::new(ActionExecutor::new(pool.clone(), &config, None));
    TriggerDispatcher::new(executor, &config)
}

// ---------------------------------------------------------------------------
// Entity fixtures
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

pub fn frame_input(customer_id: DbId, group_id: Option<DbId>) -> CreateCustomerFrame {
    CreateCustomerFrame {
        customer_id,
        group_id,
        frame_image: "frames/default.png".to_string(),
        display_name: None,
        profession_type: None,
        business_category_id: None,
    }
}

/// Insert a frame directly, without triggering any mapping work.
pub async fn raw_frame(pool: &PgPool, input: CreateCustomerFrame) -> CustomerFrame {
    let mut tx = pool.begin().await.unwrap();
    let frame = CustomerFrameRepo::create(&mut tx, &input).await.unwrap();
    tx.commit().await.unwrap();
    frame
}

/// A fresh customer owning one frame in `group_id`.
pub async fn frame_in(pool: &PgPool, username: &str, group_id: Option<DbId>) -> CustomerFrame {
    let customer_id = customer(pool, username, 5).await;
    raw_frame(pool, frame_input(customer_id, group_id)).await
}

pub async fn event(pool: &PgPool, name: &str, date: Option<Date>) -> DbId {
    EventRepo::create(
        pool,
        &CreateEvent {
            name: name.to_string(),
            event_date: date,
            media_type: None,
        },
    )
    .await
    .unwrap()
    .id
}

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

pub async fn other_post(pool: &PgPool, group_id: DbId) -> DbId {
    let category = CategoryRepo::create(
        pool,
        &CreateCategory {
            name: format!("Quotes {group_id}"),
        },
    )
    .await
    .unwrap();
    OtherPostRepo::create(
        pool,
        &CreateOtherPost {
            category_id: category.id,
            group_id: Some(group_id),
            name: "Morning quote".to_string(),
            media_type: None,
            file_path: "other/quote.png".to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn business_category(pool: &PgPool, name: &str, profession: &str) -> DbId {
    CategoryRepo::create_business(
        pool,
        &CreateBusinessCategory {
            name: name.to_string(),
            profession_type: profession.to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn business_post(
    pool: &PgPool,
    group_id: DbId,
    profession: Option<&str>,
    category_id: Option<DbId>,
) -> DbId {
    BusinessPostRepo::create(
        pool,
        &CreateBusinessPost {
            group_id: Some(group_id),
            profession_type: profession.map(str::to_string),
            business_category_id: category_id,
            media_type: None,
            file_path: "business/ad.png".to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

// ---------------------------------------------------------------------------
// Assertions
// ---------------------------------------------------------------------------

/// Post ids mapped to a frame, ascending.
pub async fn mapped_posts(pool: &PgPool, kind: MappingKind, frame_id: DbId) -> Vec<DbId> {
    let mut ids: Vec<DbId> = MappingRepo::list_for_frame(pool, kind, frame_id)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.post_id)
        .collect();
    ids.sort_unstable();
    ids
}

/// Every (frame, post) pair of a kind, ascending.
pub async fn all_pairs(pool: &PgPool, kind: MappingKind) -> Vec<(DbId, DbId)> {
    let query = format!(
        "SELECT customer_frame_id, {} FROM {} ORDER BY 1, 2",
        kind.post_column(),
        kind.mapping_table()
    );
    sqlx::query_as::<_, (DbId, DbId)>(&query)
        .fetch_all(pool)
        .await
        .unwrap()
}

pub async fn count_rows(pool: &PgPool, kind: MappingKind) -> i64 {
    let query = format!("SELECT COUNT(*) FROM {}", kind.mapping_table());
    sqlx::query_scalar(&query).fetch_one(pool).await.unwrap()
}

pub async fn mark_all_downloaded(pool: &PgPool, kind: MappingKind) {
    let query = format!("UPDATE {} SET is_downloaded = TRUE", kind.mapping_table());
    sqlx::query(&query).execute(pool).await.unwrap();
}

pub async fn downloaded_count(pool: &PgPool, kind: MappingKind) -> i64 {
    let query = format!(
        "SELECT COUNT(*) FROM {} WHERE is_downloaded",
        kind.mapping_table()
    );
    sqlx::query_scalar(&query).fetch_one(pool).await.unwrap()
}

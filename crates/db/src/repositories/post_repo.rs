//! Repositories for the three post tables.

use postframe_core::eligibility::FrameFacet;
use postframe_core::types::{Date, DbId};
use sqlx::PgPool;

use crate::models::post::{
    BusinessPost, CreateBusinessPost, CreateOtherPost, CreatePost, DatedPostRef, OtherPost, Post,
    UpdateBusinessPost,
};

// ---------------------------------------------------------------------------
// Event posts
// ---------------------------------------------------------------------------

/// Column list for `posts` queries.
const POST_COLUMNS: &str = "id, event_id, group_id, media_type, file_path, created_at, updated_at";

pub struct PostRepo;

impl PostRepo {
    pub async fn create(pool: &PgPool, input: &CreatePost) -> Result<Post, sqlx::Error> {
        let query = format!(
            "INSERT INTO posts (event_id, group_id, media_type, file_path) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {POST_COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&query)
            .bind(input.event_id)
            .bind(input.group_id)
            .bind(input.media_type.unwrap_or_default().as_str())
            .bind(&input.file_path)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Post>, sqlx::Error> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update_file_path(
        pool: &PgPool,
        id: DbId,
        file_path: &str,
    ) -> Result<Option<Post>, sqlx::Error> {
        let query =
            format!("UPDATE posts SET file_path = $2 WHERE id = $1 RETURNING {POST_COLUMNS}");
        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(file_path)
            .fetch_optional(pool)
            .await
    }

    /// Next page of posts in `group_id` whose event is dated on or after
    /// `today`, ordered by post id.
    pub async fn page_upcoming_in_group(
        pool: &PgPool,
        group_id: DbId,
        today: Date,
        after_id: DbId,
        limit: i64,
    ) -> Result<Vec<DatedPostRef>, sqlx::Error> {
        sqlx::query_as::<_, DatedPostRef>(
            "SELECT p.id, p.group_id, e.event_date \
             FROM posts p \
             JOIN events e ON e.id = p.event_id \
             WHERE p.group_id = $1 AND e.event_date >= $2 AND p.id > $3 \
             ORDER BY p.id LIMIT $4",
        )
        .bind(group_id)
        .bind(today)
        .bind(after_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn count_upcoming_in_group(
        pool: &PgPool,
        group_id: DbId,
        today: Date,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts p JOIN events e ON e.id = p.event_id \
             WHERE p.group_id = $1 AND e.event_date >= $2",
        )
        .bind(group_id)
        .bind(today)
        .fetch_one(pool)
        .await
    }

    /// `(event_id, post_id)` of the posts in `group_id` for the given events.
    ///
    /// At most one row per event thanks to `uq_posts_event_group`.
    pub async fn find_in_group_for_events(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        group_id: DbId,
        event_ids: &[DbId],
    ) -> Result<Vec<(DbId, DbId)>, sqlx::Error> {
        sqlx::query_as::<_, (DbId, DbId)>(
            "SELECT event_id, id FROM posts WHERE group_id = $1 AND event_id = ANY($2)",
        )
        .bind(group_id)
        .bind(event_ids)
        .fetch_all(&mut **tx)
        .await
    }
}

// ---------------------------------------------------------------------------
// Other posts
// ---------------------------------------------------------------------------

/// Column list for `other_posts` queries.
const OTHER_POST_COLUMNS: &str =
    "id, category_id, group_id, name, media_type, file_path, created_at, updated_at";

pub struct OtherPostRepo;

impl OtherPostRepo {
    pub async fn create(pool: &PgPool, input: &CreateOtherPost) -> Result<OtherPost, sqlx::Error> {
        let query = format!(
            "INSERT INTO other_posts (category_id, group_id, name, media_type, file_path) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {OTHER_POST_COLUMNS}"
        );
        sqlx::query_as::<_, OtherPost>(&query)
            .bind(input.category_id)
            .bind(input.group_id)
            .bind(&input.name)
            .bind(input.media_type.unwrap_or_default().as_str())
            .bind(&input.file_path)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<OtherPost>, sqlx::Error> {
        let query = format!("SELECT {OTHER_POST_COLUMNS} FROM other_posts WHERE id = $1");
        sqlx::query_as::<_, OtherPost>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update_file_path(
        pool: &PgPool,
        id: DbId,
        file_path: &str,
    ) -> Result<Option<OtherPost>, sqlx::Error> {
        let query = format!(
            "UPDATE other_posts SET file_path = $2 WHERE id = $1 RETURNING {OTHER_POST_COLUMNS}"
        );
        sqlx::query_as::<_, OtherPost>(&query)
            .bind(id)
            .bind(file_path)
            .fetch_optional(pool)
            .await
    }

    /// Next page of other posts in `group_id`, ordered by id.
    pub async fn page_in_group(
        pool: &PgPool,
        group_id: DbId,
        after_id: DbId,
        limit: i64,
    ) -> Result<Vec<OtherPost>, sqlx::Error> {
        let query = format!(
            "SELECT {OTHER_POST_COLUMNS} FROM other_posts \
             WHERE group_id = $1 AND id > $2 \
             ORDER BY id LIMIT $3"
        );
        sqlx::query_as::<_, OtherPost>(&query)
            .bind(group_id)
            .bind(after_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn count_in_group(pool: &PgPool, group_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM other_posts WHERE group_id = $1")
            .bind(group_id)
            .fetch_one(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Business posts
// ---------------------------------------------------------------------------

/// Column list for `business_posts` queries.
const BUSINESS_POST_COLUMNS: &str = "\
    id, group_id, profession_type, business_category_id, media_type, file_path, \
    created_at, updated_at";

/// SQL predicate selecting business posts that apply to a frame.
///
/// `$1` = frame group, `$2` = frame profession, `$3` = frame business
/// category. A post attribute left NULL matches any frame; a frame with a
/// NULL attribute only matches posts that leave it NULL too.
const FRAME_MATCH: &str = "\
    group_id = $1 \
    AND (profession_type IS NULL OR profession_type = $2) \
    AND (business_category_id IS NULL OR business_category_id = $3)";

pub struct BusinessPostRepo;

impl BusinessPostRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateBusinessPost,
    ) -> Result<BusinessPost, sqlx::Error> {
        let query = format!(
            "INSERT INTO business_posts \
                (group_id, profession_type, business_category_id, media_type, file_path) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {BUSINESS_POST_COLUMNS}"
        );
        sqlx::query_as::<_, BusinessPost>(&query)
            .bind(input.group_id)
            .bind(&input.profession_type)
            .bind(input.business_category_id)
            .bind(input.media_type.unwrap_or_default().as_str())
            .bind(&input.file_path)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<BusinessPost>, sqlx::Error> {
        let query = format!("SELECT {BUSINESS_POST_COLUMNS} FROM business_posts WHERE id = $1");
        sqlx::query_as::<_, BusinessPost>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateBusinessPost,
    ) -> Result<Option<BusinessPost>, sqlx::Error> {
        let query = format!(
            "UPDATE business_posts SET \
                profession_type = COALESCE($2, profession_type), \
                business_category_id = COALESCE($3, business_category_id), \
                file_path = COALESCE($4, file_path) \
             WHERE id = $1 \
             RETURNING {BUSINESS_POST_COLUMNS}"
        );
        sqlx::query_as::<_, BusinessPost>(&query)
            .bind(id)
            .bind(&input.profession_type)
            .bind(input.business_category_id)
            .bind(&input.file_path)
            .fetch_optional(pool)
            .await
    }

    /// Next page of business posts applying to `frame`, ordered by id.
    pub async fn page_matching_frame(
        pool: &PgPool,
        frame: &FrameFacet,
        after_id: DbId,
        limit: i64,
    ) -> Result<Vec<BusinessPost>, sqlx::Error> {
        let query = format!(
            "SELECT {BUSINESS_POST_COLUMNS} FROM business_posts \
             WHERE {FRAME_MATCH} AND id > $4 \
             ORDER BY id LIMIT $5"
        );
        sqlx::query_as::<_, BusinessPost>(&query)
            .bind(frame.group_id)
            .bind(&frame.profession_type)
            .bind(frame.business_category_id)
            .bind(after_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn count_matching_frame(pool: &PgPool, frame: &FrameFacet) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM business_posts WHERE {FRAME_MATCH}");
        sqlx::query_scalar(&query)
            .bind(frame.group_id)
            .bind(&frame.profession_type)
            .bind(frame.business_category_id)
            .fetch_one(pool)
            .await
    }
}

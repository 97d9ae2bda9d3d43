//! Repository for the `customer_frames` table.
//!
//! Besides plain CRUD this provides the keyset-paginated lookups the
//! eligibility resolver uses to walk every frame of a group without ever
//! loading the whole group at once.

use postframe_core::eligibility::BusinessFacet;
use postframe_core::types::DbId;
use sqlx::PgPool;

use crate::models::customer_frame::{CreateCustomerFrame, CustomerFrame, UpdateCustomerFrame};

/// Column list for `customer_frames` queries.
const COLUMNS: &str = "\
    id, customer_id, group_id, frame_image, display_name, \
    profession_type, business_category_id, created_at, updated_at";

/// SQL predicate selecting frames a business post applies to.
///
/// `$1` = post group, `$2` = post profession, `$3` = post business category.
/// A NULL profession or category on the post matches any frame.
const BUSINESS_MATCH: &str = "\
    group_id = $1 \
    AND ($2::TEXT IS NULL OR profession_type = $2) \
    AND ($3::BIGINT IS NULL OR business_category_id = $3)";

pub struct CustomerFrameRepo;

impl CustomerFrameRepo {
    /// Insert a frame inside the creation transaction.
    pub async fn create(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        input: &CreateCustomerFrame,
    ) -> Result<CustomerFrame, sqlx::Error> {
        let query = format!(
            "INSERT INTO customer_frames \
                (customer_id, group_id, frame_image, display_name, profession_type, business_category_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CustomerFrame>(&query)
            .bind(input.customer_id)
            .bind(input.group_id)
            .bind(&input.frame_image)
            .bind(&input.display_name)
            .bind(&input.profession_type)
            .bind(input.business_category_id)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CustomerFrame>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM customer_frames WHERE id = $1");
        sqlx::query_as::<_, CustomerFrame>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Load and row-lock a frame inside a transaction.
    pub async fn lock_by_id(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
    ) -> Result<Option<CustomerFrame>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM customer_frames WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, CustomerFrame>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn list_for_customer(
        pool: &PgPool,
        customer_id: DbId,
    ) -> Result<Vec<CustomerFrame>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM customer_frames WHERE customer_id = $1 ORDER BY id");
        sqlx::query_as::<_, CustomerFrame>(&query)
            .bind(customer_id)
            .fetch_all(pool)
            .await
    }

    /// Number of frames the customer already owns.
    pub async fn count_for_customer(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        customer_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM customer_frames WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_one(&mut **tx)
            .await
    }

    /// Whether the customer already has a frame with this profession and
    /// business category.
    pub async fn exists_with_business(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        customer_id: DbId,
        profession_type: &str,
        business_category_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS( \
                SELECT 1 FROM customer_frames \
                WHERE customer_id = $1 AND profession_type = $2 \
                  AND business_category_id IS NOT DISTINCT FROM $3)",
        )
        .bind(customer_id)
        .bind(profession_type)
        .bind(business_category_id)
        .fetch_one(&mut **tx)
        .await
    }

    /// Whether the customer already uses this display name.
    pub async fn display_name_taken(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        customer_id: DbId,
        display_name: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS( \
                SELECT 1 FROM customer_frames WHERE customer_id = $1 AND display_name = $2)",
        )
        .bind(customer_id)
        .bind(display_name)
        .fetch_one(&mut **tx)
        .await
    }

    /// Apply a partial update. Returns `None` if the frame does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCustomerFrame,
    ) -> Result<Option<CustomerFrame>, sqlx::Error> {
        let query = format!(
            "UPDATE customer_frames SET \
                group_id = CASE WHEN $2 THEN $3 ELSE group_id END, \
                frame_image = COALESCE($4, frame_image), \
                display_name = CASE WHEN $5 THEN $6 ELSE display_name END, \
                profession_type = CASE WHEN $7 THEN $8 ELSE profession_type END, \
                business_category_id = CASE WHEN $9 THEN $10 ELSE business_category_id END \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CustomerFrame>(&query)
            .bind(id)
            .bind(input.group_id.is_some())
            .bind(input.group_id.flatten())
            .bind(&input.frame_image)
            .bind(input.display_name.is_some())
            .bind(input.display_name.clone().flatten())
            .bind(input.profession_type.is_some())
            .bind(input.profession_type.clone().flatten())
            .bind(input.business_category_id.is_some())
            .bind(input.business_category_id.flatten())
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Keyset pages for the resolver
    // -----------------------------------------------------------------------

    /// Next page of frames in `group_id` with `id > after_id`, ordered by id.
    pub async fn page_in_group(
        pool: &PgPool,
        group_id: DbId,
        after_id: DbId,
        limit: i64,
    ) -> Result<Vec<CustomerFrame>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM customer_frames \
             WHERE group_id = $1 AND id > $2 \
             ORDER BY id LIMIT $3"
        );
        sqlx::query_as::<_, CustomerFrame>(&query)
            .bind(group_id)
            .bind(after_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn count_in_group(pool: &PgPool, group_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM customer_frames WHERE group_id = $1")
            .bind(group_id)
            .fetch_one(pool)
            .await
    }

    /// Next page of frames a business post applies to.
    pub async fn page_matching_business(
        pool: &PgPool,
        post: &BusinessFacet,
        after_id: DbId,
        limit: i64,
    ) -> Result<Vec<CustomerFrame>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM customer_frames \
             WHERE {BUSINESS_MATCH} AND id > $4 \
             ORDER BY id LIMIT $5"
        );
        sqlx::query_as::<_, CustomerFrame>(&query)
            .bind(post.group_id)
            .bind(&post.profession_type)
            .bind(post.business_category_id)
            .bind(after_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn count_matching_business(
        pool: &PgPool,
        post: &BusinessFacet,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM customer_frames WHERE {BUSINESS_MATCH}");
        sqlx::query_scalar(&query)
            .bind(post.group_id)
            .bind(&post.profession_type)
            .bind(post.business_category_id)
            .fetch_one(pool)
            .await
    }
}

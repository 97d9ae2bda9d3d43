//! Repository for the three frame-mapping tables.
//!
//! Every method takes the [`MappingKind`] and derives the table and post
//! column from it, so the per-kind tables share one implementation. The
//! kind-specific post column is always selected as `post_id`.

use postframe_core::mapping::MappingKind;
use postframe_core::types::DbId;
use sqlx::PgPool;

use crate::models::mapping::{
    BusinessLinkRow, FrameLinkRow, GroupLinkRow, MappingListQuery, MappingRow, PostLinkRow,
};

/// Maximum page size for mapping listing.
const MAX_LIMIT: i64 = 500;

/// Default page size for mapping listing.
const DEFAULT_LIMIT: i64 = 50;

/// Column list for mapping queries of `kind`.
fn columns(kind: MappingKind) -> String {
    format!(
        "id, customer_id, {} AS post_id, customer_frame_id, is_downloaded, created_at, updated_at",
        kind.post_column()
    )
}

type Tx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

pub struct MappingRepo;

impl MappingRepo {
    // -----------------------------------------------------------------------
    // Batch writes (materializer)
    // -----------------------------------------------------------------------

    /// The `(frame_id, post_id)` pairs among the given ones that already
    /// have a row.
    ///
    /// `frame_ids` and `post_ids` are parallel arrays.
    pub async fn existing_pairs(
        tx: &mut Tx<'_>,
        kind: MappingKind,
        frame_ids: &[DbId],
        post_ids: &[DbId],
    ) -> Result<Vec<(DbId, DbId)>, sqlx::Error> {
        let table = kind.mapping_table();
        let col = kind.post_column();
        let query = format!(
            "SELECT m.customer_frame_id, m.{col} \
             FROM {table} m \
             JOIN UNNEST($1::BIGINT[], $2::BIGINT[]) AS k(frame_id, post_id) \
               ON m.customer_frame_id = k.frame_id AND m.{col} = k.post_id"
        );
        sqlx::query_as::<_, (DbId, DbId)>(&query)
            .bind(frame_ids)
            .bind(post_ids)
            .fetch_all(&mut **tx)
            .await
    }

    /// Insert a row for each pair whose frame and post still exist.
    ///
    /// `customer_id` is taken from the live frame row. Pairs that lost a
    /// uniqueness race are dropped by `ON CONFLICT DO NOTHING`. Returns the
    /// number of rows inserted.
    pub async fn insert_pairs(
        tx: &mut Tx<'_>,
        kind: MappingKind,
        frame_ids: &[DbId],
        post_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let table = kind.mapping_table();
        let col = kind.post_column();
        let post_table = kind.post_table();
        let query = format!(
            "INSERT INTO {table} (customer_id, {col}, customer_frame_id, is_downloaded) \
             SELECT f.customer_id, p.id, f.id, FALSE \
             FROM UNNEST($1::BIGINT[], $2::BIGINT[]) AS k(frame_id, post_id) \
             JOIN customer_frames f ON f.id = k.frame_id \
             JOIN customers c ON c.id = f.customer_id \
             JOIN {post_table} p ON p.id = k.post_id \
             ON CONFLICT (customer_frame_id, {col}) DO NOTHING"
        );
        let result = sqlx::query(&query)
            .bind(frame_ids)
            .bind(post_ids)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    /// Flip `is_downloaded` back to false on the given pairs. Returns the
    /// number of rows that were downloaded before.
    pub async fn reset_pairs(
        tx: &mut Tx<'_>,
        kind: MappingKind,
        frame_ids: &[DbId],
        post_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let table = kind.mapping_table();
        let col = kind.post_column();
        let query = format!(
            "UPDATE {table} m SET is_downloaded = FALSE \
             FROM UNNEST($1::BIGINT[], $2::BIGINT[]) AS k(frame_id, post_id) \
             WHERE m.customer_frame_id = k.frame_id AND m.{col} = k.post_id \
               AND m.is_downloaded"
        );
        let result = sqlx::query(&query)
            .bind(frame_ids)
            .bind(post_ids)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Content-change resets
    // -----------------------------------------------------------------------

    /// Re-open every downloaded mapping of a frame.
    pub async fn reset_for_frame(
        pool: &PgPool,
        kind: MappingKind,
        frame_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let table = kind.mapping_table();
        let query = format!(
            "UPDATE {table} SET is_downloaded = FALSE \
             WHERE customer_frame_id = $1 AND is_downloaded"
        );
        let result = sqlx::query(&query).bind(frame_id).execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Re-open every downloaded mapping of a post.
    pub async fn reset_for_post(
        pool: &PgPool,
        kind: MappingKind,
        post_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let table = kind.mapping_table();
        let col = kind.post_column();
        let query =
            format!("UPDATE {table} SET is_downloaded = FALSE WHERE {col} = $1 AND is_downloaded");
        let result = sqlx::query(&query).bind(post_id).execute(pool).await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Reconciliation and pruning
    // -----------------------------------------------------------------------

    /// Event-post mappings of a frame joined with each post's group and event.
    pub async fn post_links_for_frame(
        tx: &mut Tx<'_>,
        frame_id: DbId,
    ) -> Result<Vec<PostLinkRow>, sqlx::Error> {
        sqlx::query_as::<_, PostLinkRow>(
            "SELECT m.id AS mapping_id, p.id AS post_id, p.group_id AS post_group_id, p.event_id \
             FROM customer_post_frame_mappings m \
             JOIN posts p ON p.id = m.post_id \
             WHERE m.customer_frame_id = $1 \
             ORDER BY m.id",
        )
        .bind(frame_id)
        .fetch_all(&mut **tx)
        .await
    }

    /// Mappings of a frame joined with each post's group.
    pub async fn group_links_for_frame(
        tx: &mut Tx<'_>,
        kind: MappingKind,
        frame_id: DbId,
    ) -> Result<Vec<GroupLinkRow>, sqlx::Error> {
        let table = kind.mapping_table();
        let col = kind.post_column();
        let post_table = kind.post_table();
        let query = format!(
            "SELECT m.id AS mapping_id, p.id AS post_id, p.group_id AS post_group_id \
             FROM {table} m \
             JOIN {post_table} p ON p.id = m.{col} \
             WHERE m.customer_frame_id = $1 \
             ORDER BY m.id"
        );
        sqlx::query_as::<_, GroupLinkRow>(&query)
            .bind(frame_id)
            .fetch_all(&mut **tx)
            .await
    }

    /// Business mappings of a frame joined with each business post.
    pub async fn business_links_for_frame(
        tx: &mut Tx<'_>,
        frame_id: DbId,
    ) -> Result<Vec<BusinessLinkRow>, sqlx::Error> {
        sqlx::query_as::<_, BusinessLinkRow>(
            "SELECT m.id AS mapping_id, p.id AS post_id, p.group_id, \
                    p.profession_type, p.business_category_id \
             FROM business_post_frame_mappings m \
             JOIN business_posts p ON p.id = m.business_post_id \
             WHERE m.customer_frame_id = $1 \
             ORDER BY m.id",
        )
        .bind(frame_id)
        .fetch_all(&mut **tx)
        .await
    }

    /// Business mappings of a post joined with each frame.
    pub async fn frame_links_for_business_post(
        tx: &mut Tx<'_>,
        post_id: DbId,
    ) -> Result<Vec<FrameLinkRow>, sqlx::Error> {
        sqlx::query_as::<_, FrameLinkRow>(
            "SELECT m.id AS mapping_id, f.id AS frame_id, f.customer_id, f.group_id, \
                    f.profession_type, f.business_category_id \
             FROM business_post_frame_mappings m \
             JOIN customer_frames f ON f.id = m.customer_frame_id \
             WHERE m.business_post_id = $1 \
             ORDER BY m.id",
        )
        .bind(post_id)
        .fetch_all(&mut **tx)
        .await
    }

    /// Move event-post mappings to new posts, keeping their ids and
    /// re-opening them. `mapping_ids` and `post_ids` are parallel arrays.
    pub async fn repoint(
        tx: &mut Tx<'_>,
        mapping_ids: &[DbId],
        post_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE customer_post_frame_mappings m \
             SET post_id = k.post_id, is_downloaded = FALSE \
             FROM UNNEST($1::BIGINT[], $2::BIGINT[]) AS k(mapping_id, post_id) \
             WHERE m.id = k.mapping_id",
        )
        .bind(mapping_ids)
        .bind(post_ids)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_ids(
        tx: &mut Tx<'_>,
        kind: MappingKind,
        ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let table = kind.mapping_table();
        let query = format!("DELETE FROM {table} WHERE id = ANY($1)");
        let result = sqlx::query(&query).bind(ids).execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Exposed lookups
    // -----------------------------------------------------------------------

    pub async fn find_by_id(
        pool: &PgPool,
        kind: MappingKind,
        id: DbId,
    ) -> Result<Option<MappingRow>, sqlx::Error> {
        let table = kind.mapping_table();
        let query = format!("SELECT {} FROM {table} WHERE id = $1", columns(kind));
        sqlx::query_as::<_, MappingRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The mapping of `post_id` for one of the customer's frames.
    ///
    /// A customer with several eligible frames has one row per frame; pass
    /// `frame_id` to pick one, otherwise the oldest row is returned.
    pub async fn find_for_customer_post(
        pool: &PgPool,
        kind: MappingKind,
        customer_id: DbId,
        post_id: DbId,
        frame_id: Option<DbId>,
    ) -> Result<Option<MappingRow>, sqlx::Error> {
        let table = kind.mapping_table();
        let col = kind.post_column();
        let query = format!(
            "SELECT {} FROM {table} \
             WHERE customer_id = $1 AND {col} = $2 \
               AND ($3::BIGINT IS NULL OR customer_frame_id = $3) \
             ORDER BY id LIMIT 1",
            columns(kind)
        );
        sqlx::query_as::<_, MappingRow>(&query)
            .bind(customer_id)
            .bind(post_id)
            .bind(frame_id)
            .fetch_optional(pool)
            .await
    }

    /// Mark a mapping downloaded. Idempotent; returns `None` if the row does
    /// not exist.
    pub async fn mark_downloaded(
        pool: &PgPool,
        kind: MappingKind,
        id: DbId,
    ) -> Result<Option<MappingRow>, sqlx::Error> {
        let table = kind.mapping_table();
        let query = format!(
            "UPDATE {table} SET is_downloaded = TRUE WHERE id = $1 RETURNING {}",
            columns(kind)
        );
        sqlx::query_as::<_, MappingRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_frame(
        pool: &PgPool,
        kind: MappingKind,
        frame_id: DbId,
    ) -> Result<Vec<MappingRow>, sqlx::Error> {
        let table = kind.mapping_table();
        let query = format!(
            "SELECT {} FROM {table} WHERE customer_frame_id = $1 ORDER BY id",
            columns(kind)
        );
        sqlx::query_as::<_, MappingRow>(&query)
            .bind(frame_id)
            .fetch_all(pool)
            .await
    }

    /// List a customer's mappings, newest first, optionally filtered by the
    /// download flag.
    pub async fn list_for_customer(
        pool: &PgPool,
        kind: MappingKind,
        customer_id: DbId,
        params: &MappingListQuery,
    ) -> Result<Vec<MappingRow>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);
        let table = kind.mapping_table();
        let query = format!(
            "SELECT {} FROM {table} \
             WHERE customer_id = $1 AND ($2::BOOLEAN IS NULL OR is_downloaded = $2) \
             ORDER BY id DESC LIMIT $3 OFFSET $4",
            columns(kind)
        );
        sqlx::query_as::<_, MappingRow>(&query)
            .bind(customer_id)
            .bind(params.is_downloaded)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_for_post(
        pool: &PgPool,
        kind: MappingKind,
        post_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let table = kind.mapping_table();
        let col = kind.post_column();
        let query = format!("SELECT COUNT(*) FROM {table} WHERE {col} = $1");
        sqlx::query_scalar(&query).bind(post_id).fetch_one(pool).await
    }

    pub async fn count_for_frame(
        pool: &PgPool,
        kind: MappingKind,
        frame_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let table = kind.mapping_table();
        let query = format!("SELECT COUNT(*) FROM {table} WHERE customer_frame_id = $1");
        sqlx::query_scalar(&query).bind(frame_id).fetch_one(pool).await
    }
}

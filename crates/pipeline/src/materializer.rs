//! Mapping materializer: idempotent, batched writes of mapping keys.
//!
//! Keys are deduplicated and split into batches. Each batch is one
//! transaction: read which pairs already exist, insert the rest joined
//! against live rows, and optionally re-open the existing ones. A batch that
//! fails with a transient error is retried with exponential backoff;
//! batches that already committed stay committed.

use std::collections::HashSet;

use postframe_core::eligibility::{business_post_matches, groups_match};
use postframe_core::mapping::{clamp_batch_size, dedup_keys, MappingKey, MappingKind, MaterializeResult};
use postframe_core::retry::RetryPolicy;
use postframe_core::types::DbId;
use postframe_db::repositories::{BusinessPostRepo, CustomerFrameRepo, MappingRepo};
use sqlx::PgPool;

use crate::error::{is_transient, PipelineError};

#[derive(Debug, Clone)]
pub struct Materializer {
    pool: PgPool,
    batch_size: usize,
    retry: RetryPolicy,
}

impl Materializer {
    pub fn new(pool: PgPool, batch_size: usize, retry: RetryPolicy) -> Self {
        Self {
            pool,
            batch_size: clamp_batch_size(batch_size),
            retry,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Ensure a row exists for every key.
    ///
    /// With `reset_existing`, rows that already existed and were downloaded
    /// are flipped back to not downloaded.
    pub async fn materialize<I>(
        &self,
        kind: MappingKind,
        keys: I,
        reset_existing: bool,
    ) -> Result<MaterializeResult, PipelineError>
    where
        I: IntoIterator<Item = MappingKey>,
    {
        let keys = dedup_keys(keys);
        let mut total = MaterializeResult::default();

        for (batch_index, batch) in keys.chunks(self.batch_size).enumerate() {
            total += self
                .write_batch_with_retry(kind, batch_index, batch, reset_existing)
                .await?;
        }

        if !keys.is_empty() {
            tracing::debug!(
                %kind,
                keys = keys.len(),
                created = total.created,
                updated = total.updated,
                skipped = total.skipped,
                "Materialized mappings"
            );
        }
        Ok(total)
    }

    async fn write_batch_with_retry(
        &self,
        kind: MappingKind,
        batch_index: usize,
        batch: &[MappingKey],
        reset_existing: bool,
    ) -> Result<MaterializeResult, PipelineError> {
        let mut attempt = 1;
        loop {
            match self.write_batch(kind, batch, reset_existing).await {
                Ok(result) => return Ok(result),
                Err(e) if is_transient(&e) && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        %kind,
                        batch_index,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Mapping batch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(%kind, batch_index, attempt, error = %e, "Mapping batch failed");
                    return Err(PipelineError::BatchFailed {
                        kind,
                        batch_index,
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    async fn write_batch(
        &self,
        kind: MappingKind,
        batch: &[MappingKey],
        reset_existing: bool,
    ) -> Result<MaterializeResult, sqlx::Error> {
        let (frame_ids, post_ids): (Vec<DbId>, Vec<DbId>) = batch.iter().map(|k| k.pair()).unzip();

        let mut tx = self.pool.begin().await?;

        let existing: HashSet<(DbId, DbId)> =
            MappingRepo::existing_pairs(&mut tx, kind, &frame_ids, &post_ids)
                .await?
                .into_iter()
                .collect();

        let (missing_frames, missing_posts): (Vec<DbId>, Vec<DbId>) = batch
            .iter()
            .map(|k| k.pair())
            .filter(|pair| !existing.contains(pair))
            .unzip();

        let created = if missing_frames.is_empty() {
            0
        } else {
            MappingRepo::insert_pairs(&mut tx, kind, &missing_frames, &missing_posts).await?
        };

        let updated = if reset_existing && !existing.is_empty() {
            let (frames, posts): (Vec<DbId>, Vec<DbId>) = existing.iter().copied().unzip();
            MappingRepo::reset_pairs(&mut tx, kind, &frames, &posts).await?
        } else {
            0
        };

        tx.commit().await?;

        Ok(MaterializeResult {
            created,
            updated,
            skipped: missing_frames.len() as u64 - created,
        })
    }

    // -----------------------------------------------------------------------
    // Content-change resets
    // -----------------------------------------------------------------------

    /// Re-open every mapping of a frame, across all kinds.
    pub async fn reset_for_frame(&self, frame_id: DbId) -> Result<u64, PipelineError> {
        let mut reset = 0;
        for kind in MappingKind::ALL {
            reset += MappingRepo::reset_for_frame(&self.pool, kind, frame_id).await?;
        }
        tracing::debug!(frame_id, reset, "Reset frame mappings");
        Ok(reset)
    }

    /// Re-open every mapping of a post.
    pub async fn reset_for_post(&self, kind: MappingKind, post_id: DbId) -> Result<u64, PipelineError> {
        let reset = MappingRepo::reset_for_post(&self.pool, kind, post_id).await?;
        tracing::debug!(%kind, post_id, reset, "Reset post mappings");
        Ok(reset)
    }

    // -----------------------------------------------------------------------
    // Business pruning
    // -----------------------------------------------------------------------

    /// Delete the frame's business mappings that no longer satisfy the
    /// business predicate. Returns the number of rows removed.
    pub async fn prune_business_for_frame(&self, frame_id: DbId) -> Result<u64, PipelineError> {
        let mut tx = self.pool.begin().await?;
        let removed = prune_business_for_frame_in_tx(&mut tx, frame_id).await?;
        tx.commit().await?;
        Ok(removed)
    }

    /// Delete the post's business mappings whose frame no longer matches it.
    /// A deleted post has no rows left to prune.
    pub async fn prune_business_for_post(&self, post_id: DbId) -> Result<u64, PipelineError> {
        let Some(post) = BusinessPostRepo::find_by_id(&self.pool, post_id).await? else {
            return Ok(0);
        };
        let post = post.facet();

        let mut tx = self.pool.begin().await?;
        let links = MappingRepo::frame_links_for_business_post(&mut tx, post_id).await?;
        let stale: Vec<DbId> = links
            .iter()
            .filter(|link| !business_post_matches(&link.facet(), &post))
            .map(|link| link.mapping_id)
            .collect();
        let removed = MappingRepo::delete_by_ids(&mut tx, MappingKind::BusinessPost, &stale).await?;
        tx.commit().await?;

        if removed > 0 {
            tracing::info!(post_id, removed, "Pruned ineligible business mappings");
        }
        Ok(removed)
    }
}

/// Frame-side business pruning inside a caller's transaction.
///
/// The frame row is read inside the transaction, so callers holding its
/// lock see their own update.
pub(crate) async fn prune_business_for_frame_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    frame_id: DbId,
) -> Result<u64, sqlx::Error> {
    let Some(frame) = CustomerFrameRepo::lock_by_id(tx, frame_id).await? else {
        return Ok(0);
    };
    let frame = frame.facet();

    let links = MappingRepo::business_links_for_frame(tx, frame_id).await?;
    let stale: Vec<DbId> = links
        .iter()
        .filter(|link| !business_post_matches(&frame, &link.facet()))
        .map(|link| link.mapping_id)
        .collect();
    let removed = MappingRepo::delete_by_ids(tx, MappingKind::BusinessPost, &stale).await?;
    if removed > 0 {
        tracing::info!(frame_id, removed, "Pruned ineligible business mappings");
    }
    Ok(removed)
}

/// Delete the frame's other-post mappings whose post is outside the
/// frame's group.
pub(crate) async fn prune_other_for_group(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    frame_id: DbId,
    group_id: Option<DbId>,
) -> Result<u64, sqlx::Error> {
    let links = MappingRepo::group_links_for_frame(tx, MappingKind::OtherPost, frame_id).await?;
    let stale: Vec<DbId> = links
        .iter()
        .filter(|link| !groups_match(link.post_group_id, group_id))
        .map(|link| link.mapping_id)
        .collect();
    MappingRepo::delete_by_ids(tx, MappingKind::OtherPost, &stale).await
}

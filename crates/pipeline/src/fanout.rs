//! Page-by-page fan-out: resolve one page of candidates, materialize it,
//! move on. Memory stays bounded by the page size however large the group.

use std::collections::BTreeMap;

use postframe_core::mapping::{MappingKind, MaterializeResult};
use postframe_core::types::{Date, DbId};

use crate::error::PipelineError;
use crate::materializer::Materializer;
use crate::resolver::Resolver;

#[derive(Debug, Clone)]
pub struct FanOut {
    resolver: Resolver,
    materializer: Materializer,
}

impl FanOut {
    pub fn new(resolver: Resolver, materializer: Materializer) -> Self {
        Self {
            resolver,
            materializer,
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn materializer(&self) -> &Materializer {
        &self.materializer
    }

    /// Map a post to every eligible frame. With `reset_existing`, rows that
    /// were already there are re-opened.
    pub async fn post(
        &self,
        kind: MappingKind,
        post_id: DbId,
        reset_existing: bool,
    ) -> Result<MaterializeResult, PipelineError> {
        let mut total = MaterializeResult::default();
        let Some(target) = self.resolver.load_post(kind, post_id).await? else {
            tracing::debug!(%kind, post_id, "Post vanished before fan-out");
            return Ok(total);
        };

        let mut pages = self.resolver.frames_for_post(target);
        while let Some(keys) = pages.next_page().await? {
            total += self.materializer.materialize(kind, keys, reset_existing).await?;
        }
        tracing::debug!(%kind, post_id, pages = pages.pages_fetched(), "Post fan-out done");
        Ok(total)
    }

    /// Map a frame to every eligible post of each of `kinds`.
    pub async fn frame(
        &self,
        frame_id: DbId,
        kinds: &[MappingKind],
        today: Date,
    ) -> Result<BTreeMap<MappingKind, MaterializeResult>, PipelineError> {
        let mut results = BTreeMap::new();
        let Some(frame) = self.resolver.load_frame(frame_id).await? else {
            tracing::debug!(frame_id, "Frame vanished before fan-out");
            return Ok(results);
        };

        for &kind in kinds {
            let mut total = MaterializeResult::default();
            let mut pages = self.resolver.posts_for_frame(kind, frame.clone(), today);
            while let Some(keys) = pages.next_page().await? {
                total += self.materializer.materialize(kind, keys, false).await?;
            }
            results.insert(kind, total);
        }
        Ok(results)
    }
}

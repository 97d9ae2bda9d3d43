//! Eligibility resolver: which (frame, post) pairs should exist.
//!
//! Lookups are keyset-paginated so a huge group is never loaded by one
//! unbounded query. SQL pre-filters with the same conditions as
//! `postframe_core::eligibility`; every candidate is re-checked against the
//! core predicate before it becomes a [`MappingKey`].

use std::collections::{HashMap, HashSet};

use postframe_core::eligibility::{
    business_post_matches, event_post_matches_frame, group_post_matches, BusinessFacet,
    FrameFacet,
};
use postframe_core::mapping::{MappingKey, MappingKind};
use postframe_core::types::{Date, DbId};
use postframe_db::repositories::{
    BusinessPostRepo, CustomerFrameRepo, OtherPostRepo, PostRepo,
};
use sqlx::PgPool;

/// The attributes of a post that decide which frames it fans out to.
#[derive(Debug, Clone)]
pub struct PostTarget {
    pub kind: MappingKind,
    pub post_id: DbId,
    pub group_id: Option<DbId>,
    /// Set for business posts only.
    pub business: Option<BusinessFacet>,
}

/// One page of candidate keys.
#[derive(Debug, Clone, Default)]
pub struct KeyPage {
    pub keys: Vec<MappingKey>,
    /// Cursor for the next page; `None` once the lookup is exhausted.
    pub next_after: Option<DbId>,
}

#[derive(Debug, Clone)]
pub struct Resolver {
    pool: PgPool,
    page_size: i64,
}

impl Resolver {
    pub fn new(pool: PgPool, page_size: i64) -> Self {
        Self {
            pool,
            page_size: page_size.max(1),
        }
    }

    fn cursor(&self, fetched: usize, last_id: Option<DbId>) -> Option<DbId> {
        if fetched as i64 >= self.page_size {
            last_id
        } else {
            None
        }
    }

    // -----------------------------------------------------------------------
    // Post side
    // -----------------------------------------------------------------------

    /// Load what eligibility needs to know about a post. `None` if the post
    /// no longer exists.
    pub async fn load_post(
        &self,
        kind: MappingKind,
        post_id: DbId,
    ) -> Result<Option<PostTarget>, sqlx::Error> {
        let target = match kind {
            MappingKind::Post => PostRepo::find_by_id(&self.pool, post_id)
                .await?
                .map(|p| (p.group_id, None)),
            MappingKind::OtherPost => OtherPostRepo::find_by_id(&self.pool, post_id)
                .await?
                .map(|p| (p.group_id, None)),
            MappingKind::BusinessPost => BusinessPostRepo::find_by_id(&self.pool, post_id)
                .await?
                .map(|p| (p.group_id, Some(p.facet()))),
        };
        Ok(target.map(|(group_id, business)| PostTarget {
            kind,
            post_id,
            group_id,
            business,
        }))
    }

    /// Next page of frames eligible for `target`, starting after frame
    /// `after_id`.
    pub async fn frames_page(
        &self,
        target: &PostTarget,
        after_id: DbId,
    ) -> Result<KeyPage, sqlx::Error> {
        let Some(group_id) = target.group_id else {
            return Ok(KeyPage::default());
        };

        let frames = match &target.business {
            Some(facet) => {
                CustomerFrameRepo::page_matching_business(&self.pool, facet, after_id, self.page_size)
                    .await?
            }
            None => {
                CustomerFrameRepo::page_in_group(&self.pool, group_id, after_id, self.page_size)
                    .await?
            }
        };

        let next_after = self.cursor(frames.len(), frames.last().map(|f| f.id));
        let keys = frames
            .iter()
            .map(|f| f.facet())
            .filter(|frame| match &target.business {
                Some(post) => business_post_matches(frame, post),
                None => group_post_matches(frame, target.group_id),
            })
            .map(|frame| MappingKey::new(frame.customer_id, frame.id, target.post_id))
            .collect();

        Ok(KeyPage { keys, next_after })
    }

    /// Walk every frame eligible for `target`, one page at a time.
    pub fn frames_for_post(&self, target: PostTarget) -> KeyPages<'_> {
        KeyPages::new(self, PageSource::Frames(target))
    }

    /// Every frame eligible for a post. A deleted post resolves to nothing.
    pub async fn resolve_for_new_post(
        &self,
        kind: MappingKind,
        post_id: DbId,
    ) -> Result<HashSet<MappingKey>, sqlx::Error> {
        let Some(target) = self.load_post(kind, post_id).await? else {
            tracing::debug!(%kind, post_id, "Post vanished before resolution");
            return Ok(HashSet::new());
        };
        self.frames_for_post(target).collect().await
    }

    /// Upper bound on the number of frames a post fans out to.
    pub async fn estimate_post_fanout(&self, target: &PostTarget) -> Result<u64, sqlx::Error> {
        let Some(group_id) = target.group_id else {
            return Ok(0);
        };
        let count = match &target.business {
            Some(facet) => CustomerFrameRepo::count_matching_business(&self.pool, facet).await?,
            None => CustomerFrameRepo::count_in_group(&self.pool, group_id).await?,
        };
        Ok(count.max(0) as u64)
    }

    // -----------------------------------------------------------------------
    // Frame side
    // -----------------------------------------------------------------------

    /// Load what eligibility needs to know about a frame. `None` if the frame
    /// no longer exists.
    pub async fn load_frame(&self, frame_id: DbId) -> Result<Option<FrameFacet>, sqlx::Error> {
        Ok(CustomerFrameRepo::find_by_id(&self.pool, frame_id)
            .await?
            .map(|f| f.facet()))
    }

    /// Next page of posts of `kind` eligible for `frame`, starting after post
    /// `after_id`. Event posts only count while their event is upcoming.
    pub async fn posts_page(
        &self,
        kind: MappingKind,
        frame: &FrameFacet,
        today: Date,
        after_id: DbId,
    ) -> Result<KeyPage, sqlx::Error> {
        let Some(group_id) = frame.group_id else {
            return Ok(KeyPage::default());
        };

        let (fetched, last_id, post_ids): (usize, Option<DbId>, Vec<DbId>) = match kind {
            MappingKind::Post => {
                let posts = PostRepo::page_upcoming_in_group(
                    &self.pool,
                    group_id,
                    today,
                    after_id,
                    self.page_size,
                )
                .await?;
                let ids = posts
                    .iter()
                    .filter(|p| event_post_matches_frame(frame, p.group_id, p.event_date, today))
                    .map(|p| p.id)
                    .collect();
                (posts.len(), posts.last().map(|p| p.id), ids)
            }
            MappingKind::OtherPost => {
                let posts =
                    OtherPostRepo::page_in_group(&self.pool, group_id, after_id, self.page_size)
                        .await?;
                let ids = posts
                    .iter()
                    .filter(|p| group_post_matches(frame, p.group_id))
                    .map(|p| p.id)
                    .collect();
                (posts.len(), posts.last().map(|p| p.id), ids)
            }
            MappingKind::BusinessPost => {
                let posts = BusinessPostRepo::page_matching_frame(
                    &self.pool,
                    frame,
                    after_id,
                    self.page_size,
                )
                .await?;
                let ids = posts
                    .iter()
                    .filter(|p| business_post_matches(frame, &p.facet()))
                    .map(|p| p.id)
                    .collect();
                (posts.len(), posts.last().map(|p| p.id), ids)
            }
        };

        Ok(KeyPage {
            keys: post_ids
                .into_iter()
                .map(|post_id| MappingKey::new(frame.customer_id, frame.id, post_id))
                .collect(),
            next_after: self.cursor(fetched, last_id),
        })
    }

    /// Walk every post of `kind` eligible for `frame`, one page at a time.
    pub fn posts_for_frame(&self, kind: MappingKind, frame: FrameFacet, today: Date) -> KeyPages<'_> {
        KeyPages::new(self, PageSource::Posts { kind, frame, today })
    }

    /// Every post of every kind eligible for a frame. A deleted frame
    /// resolves to nothing.
    pub async fn resolve_for_new_frame(
        &self,
        frame_id: DbId,
        today: Date,
    ) -> Result<HashMap<MappingKind, HashSet<MappingKey>>, sqlx::Error> {
        let mut resolved = HashMap::new();
        let Some(frame) = self.load_frame(frame_id).await? else {
            tracing::debug!(frame_id, "Frame vanished before resolution");
            return Ok(resolved);
        };

        for kind in MappingKind::ALL {
            let keys = self.posts_for_frame(kind, frame.clone(), today).collect().await?;
            resolved.insert(kind, keys);
        }
        Ok(resolved)
    }

    /// Upper bound on the number of posts of `kinds` a frame fans out to.
    pub async fn estimate_frame_fanout(
        &self,
        frame: &FrameFacet,
        kinds: &[MappingKind],
        today: Date,
    ) -> Result<u64, sqlx::Error> {
        let Some(group_id) = frame.group_id else {
            return Ok(0);
        };
        let mut total = 0i64;
        for kind in kinds {
            total += match kind {
                MappingKind::Post => {
                    PostRepo::count_upcoming_in_group(&self.pool, group_id, today).await?
                }
                MappingKind::OtherPost => OtherPostRepo::count_in_group(&self.pool, group_id).await?,
                MappingKind::BusinessPost => {
                    BusinessPostRepo::count_matching_frame(&self.pool, frame).await?
                }
            };
        }
        Ok(total.max(0) as u64)
    }
}

// ---------------------------------------------------------------------------
// KeyPages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum PageSource {
    Frames(PostTarget),
    Posts {
        kind: MappingKind,
        frame: FrameFacet,
        today: Date,
    },
}

/// Keyset cursor over one resolution. Each call to
/// [`next_page`](Self::next_page) issues one bounded query.
#[derive(Debug)]
pub struct KeyPages<'a> {
    resolver: &'a Resolver,
    source: PageSource,
    /// `None` once the lookup is exhausted.
    after: Option<DbId>,
    pages: usize,
}

impl<'a> KeyPages<'a> {
    fn new(resolver: &'a Resolver, source: PageSource) -> Self {
        Self {
            resolver,
            source,
            after: Some(0),
            pages: 0,
        }
    }

    /// Keys of the next page, or `None` when there are no pages left. A page
    /// may be empty when every candidate on it failed the core predicate.
    pub async fn next_page(&mut self) -> Result<Option<Vec<MappingKey>>, sqlx::Error> {
        let Some(after) = self.after else {
            return Ok(None);
        };
        let page = match &self.source {
            PageSource::Frames(target) => self.resolver.frames_page(target, after).await?,
            PageSource::Posts { kind, frame, today } => {
                self.resolver.posts_page(*kind, frame, *today, after).await?
            }
        };
        self.after = page.next_after;
        self.pages += 1;
        Ok(Some(page.keys))
    }

    /// Pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Drain the remaining pages into one set.
    pub async fn collect(mut self) -> Result<HashSet<MappingKey>, sqlx::Error> {
        let mut keys = HashSet::new();
        while let Some(page) = self.next_page().await? {
            keys.extend(page);
        }
        Ok(keys)
    }
}

//! Mapping kinds, keys, batching, and materialization summaries.
//!
//! A mapping row asserts "this customer's frame is eligible to be composited
//! with this post". There is one physical table per post kind; everything that
//! differs between them is captured by [`MappingKind`].

use std::collections::HashSet;
use std::fmt;
use std::ops::AddAssign;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Batch sizing
// ---------------------------------------------------------------------------

/// Default number of mapping keys written per transaction.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Smallest batch size accepted from configuration.
pub const MIN_BATCH_SIZE: usize = 200;

/// Largest batch size accepted from configuration.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Default page size for frame/post lookups during resolution.
pub const DEFAULT_PAGE_SIZE: i64 = 500;

/// Clamp a configured batch size into `MIN_BATCH_SIZE..=MAX_BATCH_SIZE`.
pub fn clamp_batch_size(requested: usize) -> usize {
    requested.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE)
}

// ---------------------------------------------------------------------------
// MappingKind
// ---------------------------------------------------------------------------

/// The three post kinds that fan out into mapping rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    /// Event-scoped post (`posts`).
    Post,
    /// Category-scoped post (`other_posts`).
    OtherPost,
    /// Profession / business-category scoped post (`business_posts`).
    BusinessPost,
}

impl MappingKind {
    /// Every kind, in a stable order.
    pub const ALL: [MappingKind; 3] = [
        MappingKind::Post,
        MappingKind::OtherPost,
        MappingKind::BusinessPost,
    ];

    /// Snake-case name used in URLs, job payloads, and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            MappingKind::Post => "post",
            MappingKind::OtherPost => "other_post",
            MappingKind::BusinessPost => "business_post",
        }
    }

    /// Table holding the posts of this kind.
    pub fn post_table(self) -> &'static str {
        match self {
            MappingKind::Post => "posts",
            MappingKind::OtherPost => "other_posts",
            MappingKind::BusinessPost => "business_posts",
        }
    }

    /// Table holding the mapping rows of this kind.
    pub fn mapping_table(self) -> &'static str {
        match self {
            MappingKind::Post => "customer_post_frame_mappings",
            MappingKind::OtherPost => "customer_other_post_frame_mappings",
            MappingKind::BusinessPost => "business_post_frame_mappings",
        }
    }

    /// Column in the mapping table that references the post.
    pub fn post_column(self) -> &'static str {
        match self {
            MappingKind::Post => "post_id",
            MappingKind::OtherPost => "other_post_id",
            MappingKind::BusinessPost => "business_post_id",
        }
    }
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(MappingKind::Post),
            "other_post" => Ok(MappingKind::OtherPost),
            "business_post" => Ok(MappingKind::BusinessPost),
            other => Err(CoreError::Validation(format!(
                "Unknown mapping kind: \"{other}\""
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// MappingKey
// ---------------------------------------------------------------------------

/// One (customer, frame, post) triple to materialize.
///
/// Identity is the (frame, post) pair: the customer is derived from the frame
/// and never participates in uniqueness.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MappingKey {
    pub customer_id: DbId,
    pub customer_frame_id: DbId,
    pub post_id: DbId,
}

impl MappingKey {
    pub fn new(customer_id: DbId, customer_frame_id: DbId, post_id: DbId) -> Self {
        Self {
            customer_id,
            customer_frame_id,
            post_id,
        }
    }

    /// The (frame, post) pair the store keeps unique.
    pub fn pair(&self) -> (DbId, DbId) {
        (self.customer_frame_id, self.post_id)
    }
}

impl PartialEq for MappingKey {
    fn eq(&self, other: &Self) -> bool {
        self.pair() == other.pair()
    }
}

impl Eq for MappingKey {}

impl std::hash::Hash for MappingKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.pair().hash(state);
    }
}

/// Remove duplicate (frame, post) pairs, keeping the first occurrence.
///
/// Callers are never trusted to hand in a unique candidate set.
pub fn dedup_keys<I>(keys: I) -> Vec<MappingKey>
where
    I: IntoIterator<Item = MappingKey>,
{
    let mut seen = HashSet::new();
    keys.into_iter().filter(|k| seen.insert(k.pair())).collect()
}

// ---------------------------------------------------------------------------
// MaterializeResult
// ---------------------------------------------------------------------------

/// Summary of one materialization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeResult {
    /// New rows inserted.
    pub created: u64,
    /// Existing rows whose `is_downloaded` flag was reset.
    pub updated: u64,
    /// Pairs neither inserted nor pre-existing: lost a uniqueness race or
    /// referenced an entity deleted mid-run.
    pub skipped: u64,
}

impl MaterializeResult {
    /// `true` when the run touched no rows at all.
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0
    }
}

impl AddAssign for MaterializeResult {
    fn add_assign(&mut self, rhs: Self) {
        self.created += rhs.created;
        self.updated += rhs.updated;
        self.skipped += rhs.skipped;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

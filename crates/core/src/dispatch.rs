//! Dispatch mode selection for mapping actions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Largest fan-out (in candidate pairs) run inside the triggering request in
/// [`DispatchMode::Auto`]. Anything bigger goes to the worker queue.
pub const DEFAULT_INLINE_LIMIT: u64 = 100;

/// Where triggered mapping work runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Always run in-process before returning.
    Inline,
    /// Always enqueue a durable job for the worker.
    Queued,
    /// Run inline when the estimated fan-out is small, enqueue otherwise.
    Auto,
}

impl DispatchMode {
    /// Decide whether an action with `estimated_pairs` candidates runs inline.
    pub fn runs_inline(self, estimated_pairs: u64, inline_limit: u64) -> bool {
        match self {
            DispatchMode::Inline => true,
            DispatchMode::Queued => false,
            DispatchMode::Auto => estimated_pairs <= inline_limit,
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DispatchMode::Inline => "inline",
            DispatchMode::Queued => "queued",
            DispatchMode::Auto => "auto",
        })
    }
}

impl FromStr for DispatchMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" | "sync" => Ok(DispatchMode::Inline),
            "queued" | "async" => Ok(DispatchMode::Queued),
            "auto" => Ok(DispatchMode::Auto),
            other => Err(CoreError::Validation(format!(
                "Unknown dispatch mode: \"{other}\""
            ))),
        }
    }
}

//! Error taxonomy for group persistence.
//!
//! Only `IndexPropagation` and `Timeout` signal that the store may hold
//! partial state the caller has to reconcile; every other kind either fires
//! before any write or names the single key it concerns.

use std::time::Duration;
use thiserror::Error;

use crate::index::IndexDirection;

/// Failures from the underlying key-value backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("value at {key} could not be decoded: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A single user's back-reference update going wrong.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("user record {0} does not exist")]
    MissingUser(String),
}

/// Aggregate outcome of a back-reference fan-out that did not fully land.
///
/// The group record was already written (attach) or read for deletion
/// (detach) when this fires, so the store holds the group and its secondary
/// indexes in an inconsistent state. `updated` and `failed` together cover
/// every affected user exactly once; `compensation_failures` records any
/// best-effort rollback steps that themselves failed.
#[derive(Debug, Error)]
#[error(
    "{direction} propagation for group {group_id} failed for {} of {} users",
    .failed.len(),
    .updated.len() + .failed.len()
)]
pub struct IndexPropagationError {
    pub direction: IndexDirection,
    pub group_id: String,
    pub updated: Vec<String>,
    pub failed: Vec<(String, IndexError)>,
    pub compensation_failures: Vec<String>,
}

/// Errors surfaced by [`GroupRepository`](crate::repository::GroupRepository).
#[derive(Debug, Error)]
pub enum GroupError {
    /// Malformed input, rejected before any I/O.
    #[error("invalid group input: {0}")]
    Validation(String),
    /// Referenced admin/user/pad ids that do not resolve. Detected before
    /// the group record is written.
    #[error("unknown references: {}", .missing.join(", "))]
    Reference { missing: Vec<String> },
    #[error("group {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    IndexPropagation(#[from] IndexPropagationError),
    /// The operation deadline elapsed mid-flight. Store writes may already
    /// have landed, so this is partial-state territory like
    /// `IndexPropagation`.
    #[error("operation timed out after {waited:?}; store writes may have landed")]
    Timeout { waited: Duration },
    /// Declared surface whose upstream semantics are unspecified.
    #[error("{0} is not implemented")]
    Unimplemented(&'static str),
}

//! store::traits
//!
//! Object-store trait definition.
//!
//! # Design
//!
//! The `ObjectStore` trait is async because store operations involve
//! network I/O. All methods return `Result` so callers can distinguish
//! transport failures from per-key outcomes.
//!
//! Two properties matter to the sync pipeline:
//!
//! - `list` must run its pagination to completion and say so. A
//!   truncated listing is not an error; it is a listing with
//!   `completed = false`, and the planner records that so the plan
//!   validator can refuse to act on it.
//! - `delete_batch` collects per-key failures instead of
//!   short-circuiting. One undeletable key must not abort its batch.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`; the applier shares one store
//! reference across concurrent upload tasks.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::ObjectKey;

/// Maximum keys accepted by a single delete batch request.
pub const MAX_DELETE_BATCH: usize = 1000;

/// Errors from store operations.
///
/// These cover whole-request failures. Per-key delete failures are data,
/// carried in [`BatchDeleteOutcome`], not errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A delete batch exceeded [`MAX_DELETE_BATCH`] keys.
    #[error("delete batch of {0} keys exceeds the {MAX_DELETE_BATCH}-key limit")]
    BatchTooLarge(usize),

    /// Local I/O failed while reading an upload source.
    #[error("object store i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend rejected or failed the request.
    #[error("object store error: {0}")]
    Backend(String),
}

/// One object in a remote listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Object key.
    pub key: ObjectKey,
    /// Recorded ETag, quotes stripped.
    pub etag: String,
    /// Object size in bytes.
    pub size: u64,
}

/// A listing of all objects under a prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectListing {
    /// The listed objects.
    pub objects: Vec<RemoteObject>,
    /// Whether pagination ran to completion.
    ///
    /// `false` means the listing is best-effort and any plan built on
    /// it must be treated as unsafe.
    pub completed: bool,
}

/// A per-key delete failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    /// The key that could not be deleted.
    pub key: ObjectKey,
    /// Backend-reported reason.
    pub message: String,
}

/// The outcome of one delete batch: successes and failures together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDeleteOutcome {
    /// Keys confirmed deleted.
    pub deleted: Vec<ObjectKey>,
    /// Keys that failed, with reasons.
    pub failed: Vec<DeleteFailure>,
}

/// The object-store interface consumed by the sync pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object whose key starts with `prefix`.
    ///
    /// Implementations paginate internally and report completion via
    /// [`ObjectListing::completed`]. An interrupted pagination returns
    /// the objects gathered so far with `completed = false` rather than
    /// an error.
    async fn list(&self, prefix: &str) -> Result<ObjectListing, StoreError>;

    /// Upload a local file to the given key, replacing any existing
    /// object.
    async fn put_file(&self, key: &ObjectKey, source: &Path) -> Result<(), StoreError>;

    /// Delete up to [`MAX_DELETE_BATCH`] keys in one request.
    ///
    /// Per-key failures are collected in the outcome; the batch as a
    /// whole only errors when the request itself cannot be made or the
    /// batch is oversized. Deleting an absent key succeeds.
    async fn delete_batch(&self, keys: &[ObjectKey]) -> Result<BatchDeleteOutcome, StoreError>;
}

//! sync::apply
//!
//! Executes a validated sync plan against the object store.
//!
//! # Applier Contract
//!
//! The applier MUST:
//! 1. Re-validate the plan and refuse one that fails the gates
//! 2. Stage every upload source into a temporary directory mirroring
//!    destination keys, isolating the upload mechanism from the build
//!    output layout
//! 3. Run uploads with bounded concurrency before any delete
//! 4. Batch deletes at the store limit, collecting per-key failures
//!    without aborting subsequent batches
//! 5. Report every operation through structured logging and aggregate
//!    the counts in the returned summary
//!
//! Applying is idempotent against an already-converged remote: a second
//! planning pass after a successful apply yields an all-Skip plan, and
//! applying that plan performs no operation.
//!
//! # Cancellation
//!
//! The cancellation token is checked before each upload starts and
//! between delete batches. A batch is never split: the batch is the
//! atomicity unit, which is exactly why the delete-ratio gate lives at
//! the plan level rather than here.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::plan::SyncPlan;
use super::validate::{PlanValidator, ValidationError};
use crate::core::types::ObjectKey;
use crate::store::{ObjectStore, MAX_DELETE_BATCH};

/// Default number of concurrent uploads.
const DEFAULT_UPLOAD_CONCURRENCY: usize = 8;

/// Errors that abort an apply outright.
///
/// Per-key upload and delete failures are not here; they are data,
/// collected in [`ApplySummary::failures`].
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The plan failed validation; nothing was applied.
    #[error("refusing to apply: {0}")]
    Invalid(#[from] ValidationError),

    /// Upload sources could not be staged.
    #[error("cannot stage uploads: {0}")]
    Staging(#[from] std::io::Error),

    /// The apply was cancelled before completion.
    #[error("apply cancelled")]
    Cancelled,
}

/// One failed file operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyFailure {
    /// The key the operation targeted.
    pub key: ObjectKey,
    /// The operation kind (`upload` or `delete`).
    pub operation: &'static str,
    /// Failure description.
    pub message: String,
}

/// Aggregate outcome of one apply.
#[derive(Debug, Clone, Default)]
pub struct ApplySummary {
    /// Identifier of the applied plan.
    pub plan_id: String,
    /// Successfully uploaded files (adds and updates).
    pub uploaded: usize,
    /// Successfully deleted keys.
    pub deleted: usize,
    /// Files skipped as unchanged.
    pub skipped: usize,
    /// Per-key failures across uploads and deletes.
    pub failures: Vec<ApplyFailure>,
    /// Total bytes uploaded.
    pub bytes_uploaded: u64,
    /// Mutation counts by file extension (`<none>` for extensionless
    /// keys); low-cardinality by construction.
    pub by_extension: BTreeMap<String, usize>,
    /// Wall-clock duration of the apply.
    pub duration: Duration,
}

impl ApplySummary {
    /// Whether every operation succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn count_extension(&mut self, key: &ObjectKey) {
        let extension = key.extension().unwrap_or("<none>").to_string();
        *self.by_extension.entry(extension).or_insert(0) += 1;
    }
}

/// Applies validated plans to the object store.
pub struct SyncApplier<'a> {
    store: &'a dyn ObjectStore,
    validator: PlanValidator,
    upload_concurrency: usize,
    delete_batch_size: usize,
}

impl<'a> SyncApplier<'a> {
    /// Create an applier with default gating and concurrency.
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self {
            store,
            validator: PlanValidator::default(),
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            delete_batch_size: MAX_DELETE_BATCH,
        }
    }

    /// Override the plan validator.
    pub fn with_validator(mut self, validator: PlanValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Override the upload concurrency bound.
    pub fn with_upload_concurrency(mut self, concurrency: usize) -> Self {
        self.upload_concurrency = concurrency.max(1);
        self
    }

    /// Override the delete batch size, clamped to the store limit.
    pub fn with_delete_batch_size(mut self, size: usize) -> Self {
        self.delete_batch_size = size.clamp(1, MAX_DELETE_BATCH);
        self
    }

    /// Apply a plan.
    ///
    /// # Errors
    ///
    /// - [`ApplyError::Invalid`] when the plan fails validation;
    ///   nothing has been applied
    /// - [`ApplyError::Staging`] when upload sources cannot be copied
    ///   into the staging directory; nothing has been applied
    /// - [`ApplyError::Cancelled`] when the token fires; completed
    ///   operations stand, no batch is left half-committed
    pub async fn apply(
        &self,
        plan: &SyncPlan,
        cancel: &CancellationToken,
    ) -> Result<ApplySummary, ApplyError> {
        self.validator.validate(plan)?;

        let started = Instant::now();
        let mut summary = ApplySummary {
            plan_id: plan.plan_id.clone(),
            skipped: plan.skip.len(),
            ..ApplySummary::default()
        };

        let staging = self.stage_uploads(plan, cancel).await?;
        self.upload_staged(&staging, &mut summary, cancel).await;
        if cancel.is_cancelled() {
            return Err(ApplyError::Cancelled);
        }
        self.delete_batched(plan, &mut summary, cancel).await?;

        summary.duration = started.elapsed();
        tracing::info!(
            plan_id = %summary.plan_id,
            uploaded = summary.uploaded,
            deleted = summary.deleted,
            skipped = summary.skipped,
            failures = summary.failures.len(),
            bytes_uploaded = summary.bytes_uploaded,
            duration_ms = summary.duration.as_millis() as u64,
            "sync apply finished"
        );
        Ok(summary)
    }

    /// Copy every add and update source into a staging directory laid
    /// out by destination key.
    async fn stage_uploads(
        &self,
        plan: &SyncPlan,
        cancel: &CancellationToken,
    ) -> Result<StagedUploads, ApplyError> {
        let dir = tempfile::TempDir::new()?;
        let sources = plan
            .add
            .iter()
            .map(|r| (&r.local_path, &r.key))
            .chain(plan.update.iter().map(|r| (&r.local_path, &r.key)));

        let mut files = Vec::new();
        for (local_path, key) in sources {
            if cancel.is_cancelled() {
                return Err(ApplyError::Cancelled);
            }
            let staged = dir.path().join(key.as_str());
            if let Some(parent) = staged.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let size = tokio::fs::copy(local_path, &staged).await?;
            files.push(StagedFile {
                key: key.clone(),
                path: staged,
                size,
            });
        }
        Ok(StagedUploads { _dir: dir, files })
    }

    /// Upload staged files with bounded concurrency, collecting per-key
    /// failures.
    async fn upload_staged(
        &self,
        staging: &StagedUploads,
        summary: &mut ApplySummary,
        cancel: &CancellationToken,
    ) {
        let outcomes: Vec<UploadOutcome> = stream::iter(staging.files.iter())
            .map(|file| async move {
                if cancel.is_cancelled() {
                    return UploadOutcome::Cancelled;
                }
                match self.store.put_file(&file.key, &file.path).await {
                    Ok(()) => {
                        tracing::info!(key = %file.key, size = file.size, "uploaded");
                        UploadOutcome::Uploaded {
                            key: file.key.clone(),
                            size: file.size,
                        }
                    }
                    Err(error) => {
                        tracing::warn!(key = %file.key, %error, "upload failed");
                        UploadOutcome::Failed {
                            key: file.key.clone(),
                            message: error.to_string(),
                        }
                    }
                }
            })
            .buffer_unordered(self.upload_concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                UploadOutcome::Uploaded { key, size } => {
                    summary.uploaded += 1;
                    summary.bytes_uploaded += size;
                    summary.count_extension(&key);
                }
                UploadOutcome::Failed { key, message } => {
                    summary.failures.push(ApplyFailure {
                        key,
                        operation: "upload",
                        message,
                    });
                }
                UploadOutcome::Cancelled => {}
            }
        }
    }

    /// Delete in batches, never splitting a batch on cancellation and
    /// never aborting later batches on earlier failures.
    async fn delete_batched(
        &self,
        plan: &SyncPlan,
        summary: &mut ApplySummary,
        cancel: &CancellationToken,
    ) -> Result<(), ApplyError> {
        let keys: Vec<ObjectKey> = plan.delete.iter().map(|r| r.key.clone()).collect();
        for batch in keys.chunks(self.delete_batch_size) {
            if cancel.is_cancelled() {
                return Err(ApplyError::Cancelled);
            }
            match self.store.delete_batch(batch).await {
                Ok(outcome) => {
                    for key in &outcome.deleted {
                        tracing::info!(%key, "deleted");
                        summary.count_extension(key);
                    }
                    summary.deleted += outcome.deleted.len();
                    for failure in outcome.failed {
                        tracing::warn!(key = %failure.key, message = %failure.message, "delete failed");
                        summary.failures.push(ApplyFailure {
                            key: failure.key,
                            operation: "delete",
                            message: failure.message,
                        });
                    }
                }
                Err(error) => {
                    // The whole request failed; record every key in the
                    // batch and keep going with the next one.
                    tracing::warn!(%error, batch_size = batch.len(), "delete batch failed");
                    let message = error.to_string();
                    for key in batch {
                        summary.failures.push(ApplyFailure {
                            key: key.clone(),
                            operation: "delete",
                            message: message.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Staging directory plus its file inventory; the directory is removed
/// on drop.
struct StagedUploads {
    _dir: tempfile::TempDir,
    files: Vec<StagedFile>,
}

/// One staged upload source.
struct StagedFile {
    key: ObjectKey,
    path: std::path::PathBuf,
    size: u64,
}

/// Outcome of one upload attempt.
enum UploadOutcome {
    Uploaded { key: ObjectKey, size: u64 },
    Failed { key: ObjectKey, message: String },
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::sync::plan::{AddRequest, DeleteRequest, SkipRequest};
    use crate::sync::planner::SyncPlanner;
    use tempfile::TempDir;

    async fn output_with(files: &[(&str, &[u8])]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (relative, content) in files {
            let path = dir.path().join(relative);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.unwrap();
            }
            tokio::fs::write(&path, content).await.unwrap();
        }
        dir
    }

    fn key(raw: &str) -> ObjectKey {
        ObjectKey::new(raw).unwrap()
    }

    #[tokio::test]
    async fn applies_a_full_plan() {
        let out = output_with(&[
            ("new.html", b"new".as_slice()),
            ("changed.html", b"fresh".as_slice()),
            ("same.html", b"same".as_slice()),
        ])
        .await;

        let store = InMemoryStore::new();
        store.seed("docs/changed.html", b"stale");
        store.seed("docs/same.html", b"same");
        store.seed("docs/gone.html", b"gone");

        let plan = SyncPlanner::new(&store, out.path(), "docs")
            .plan()
            .await
            .unwrap();
        let summary = SyncApplier::new(&store)
            .apply(&plan, &CancellationToken::new())
            .await
            .unwrap();

        assert!(summary.is_clean());
        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.bytes_uploaded, 8);
        assert_eq!(summary.by_extension["html"], 3);

        assert!(store.contains("docs/new.html"));
        assert!(store.contains("docs/changed.html"));
        assert!(store.contains("docs/same.html"));
        assert!(!store.contains("docs/gone.html"));
    }

    #[tokio::test]
    async fn refuses_invalid_plan() {
        let store = InMemoryStore::new();
        store.seed("docs/a.html", b"a");

        let mut plan = SyncPlan::new();
        plan.delete.push(DeleteRequest {
            key: key("docs/a.html"),
        });
        plan.total_remote_files = 1;
        plan.remote_listing_completed = false;

        let result = SyncApplier::new(&store)
            .apply(&plan, &CancellationToken::new())
            .await;
        assert!(matches!(
            result,
            Err(ApplyError::Invalid(ValidationError::ListingIncomplete))
        ));
        // Nothing was applied
        assert!(store.contains("docs/a.html"));
    }

    #[tokio::test]
    async fn uploads_happen_before_deletes() {
        let out = output_with(&[("renamed.html", b"content".as_slice())]).await;

        let store = InMemoryStore::new();
        // Ten remote files so a single delete stays under the ratio gate
        for i in 0..9 {
            store.seed(&format!("docs/keep{}.html", i), b"keep");
        }
        store.seed("docs/old.html", b"content");

        let mut plan = SyncPlanner::new(&store, out.path(), "docs")
            .plan()
            .await
            .unwrap();
        // Keep only the rename pair: add renamed, delete old
        plan.skip.clear();
        plan.delete.retain(|r| r.key.as_str() == "docs/old.html");

        SyncApplier::new(&store)
            .apply(&plan, &CancellationToken::new())
            .await
            .unwrap();

        let operations = store.operations();
        let put_pos = operations
            .iter()
            .position(|op| op == "put:docs/renamed.html")
            .unwrap();
        let delete_pos = operations
            .iter()
            .position(|op| op.starts_with("delete-batch"))
            .unwrap();
        assert!(put_pos < delete_pos, "{:?}", operations);
    }

    #[tokio::test]
    async fn per_key_failures_do_not_abort() {
        let out = output_with(&[
            ("ok.html", b"ok".as_slice()),
            ("broken.html", b"broken".as_slice()),
        ])
        .await;

        let store = InMemoryStore::new();
        store.fail_put("docs/broken.html");

        let plan = SyncPlanner::new(&store, out.path(), "docs")
            .plan()
            .await
            .unwrap();
        let summary = SyncApplier::new(&store)
            .apply(&plan, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.uploaded, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].operation, "upload");
        assert_eq!(summary.failures[0].key.as_str(), "docs/broken.html");
        assert!(store.contains("docs/ok.html"));
    }

    #[tokio::test]
    async fn deletes_are_batched_and_failures_collected() {
        let out = TempDir::new().unwrap();

        let store = InMemoryStore::new();
        for i in 0..25 {
            store.seed(&format!("docs/page{:02}.html", i), b"x");
        }
        store.fail_delete("docs/page07.html");

        let plan = SyncPlanner::new(&store, out.path(), "docs")
            .plan()
            .await
            .unwrap();
        // Empty local tree deletes everything; raise the gate for the test
        let summary = SyncApplier::new(&store)
            .with_validator(PlanValidator::new(1.0))
            .with_delete_batch_size(10)
            .apply(&plan, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(store.delete_batch_count(), 3);
        assert_eq!(summary.deleted, 24);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].key.as_str(), "docs/page07.html");
        assert!(store.contains("docs/page07.html"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_stops_the_apply() {
        let out = output_with(&[("a.html", b"a".as_slice())]).await;
        let store = InMemoryStore::new();

        let plan = SyncPlanner::new(&store, out.path(), "docs")
            .plan()
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = SyncApplier::new(&store).apply(&plan, &cancel).await;

        assert!(matches!(result, Err(ApplyError::Cancelled)));
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn staging_isolates_uploads_from_later_source_changes() {
        let out = output_with(&[("page.html", b"original".as_slice())]).await;
        let store = InMemoryStore::new();

        let mut plan = SyncPlan::new();
        plan.add.push(AddRequest {
            local_path: out.path().join("page.html"),
            key: key("docs/page.html"),
        });
        plan.total_source_files = 1;
        plan.remote_listing_completed = true;

        let summary = SyncApplier::new(&store)
            .apply(&plan, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.uploaded, 1);
        assert_eq!(summary.bytes_uploaded, 8);
    }

    #[tokio::test]
    async fn noop_plan_applies_cleanly() {
        let store = InMemoryStore::new();
        store.seed("docs/a.html", b"a");

        let mut plan = SyncPlan::new();
        plan.skip.push(SkipRequest {
            key: key("docs/a.html"),
        });
        plan.total_source_files = 1;
        plan.total_remote_files = 1;
        plan.remote_listing_completed = true;

        let summary = SyncApplier::new(&store)
            .apply(&plan, &CancellationToken::new())
            .await
            .unwrap();
        assert!(summary.is_clean());
        assert_eq!(summary.uploaded, 0);
        assert_eq!(summary.deleted, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(store.put_count(), 0);
    }
}

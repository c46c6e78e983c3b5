//! sync::planner
//!
//! Computes the categorized diff between a local build-output tree and
//! the remote store's current listing.
//!
//! # Invariants
//!
//! - The planner performs no mutation; it reads the local tree and the
//!   remote listing, nothing else
//! - Every local file and every remote key lands in exactly one of the
//!   four plan categories
//! - The remote listing's completion flag is carried into the plan
//!   verbatim; an interrupted pagination still yields a best-effort
//!   plan, and the validator refuses it downstream

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::etag::{etags_match, fingerprint_file, DEFAULT_PART_SIZE};
use super::plan::{AddRequest, DeleteRequest, SkipRequest, SyncPlan, UpdateRequest};
use crate::core::types::{ObjectKey, TypeError};
use crate::store::{ObjectStore, StoreError};

/// Errors from planning.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The local build output could not be read.
    #[error("cannot read build output: {0}")]
    Io(#[from] std::io::Error),

    /// The remote listing request failed outright.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A local path or remote key does not form a valid object key.
    #[error("invalid destination key: {0}")]
    Key(#[from] TypeError),
}

/// Plans an incremental sync of one build-output tree.
pub struct SyncPlanner<'a> {
    store: &'a dyn ObjectStore,
    local_root: PathBuf,
    remote_prefix: String,
    part_size: u64,
}

impl<'a> SyncPlanner<'a> {
    /// Create a planner for the given output tree and remote prefix.
    pub fn new(
        store: &'a dyn ObjectStore,
        local_root: impl Into<PathBuf>,
        remote_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            local_root: local_root.into(),
            remote_prefix: remote_prefix.into().trim_matches('/').to_string(),
            part_size: DEFAULT_PART_SIZE,
        }
    }

    /// Override the multipart fingerprint part size.
    pub fn with_part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size;
        self
    }

    /// Compute the plan.
    ///
    /// Lists the full remote prefix, fingerprints every local file, and
    /// categorizes: local-only is Add, remote-only is Delete, differing
    /// fingerprints are Update, matching fingerprints are Skip.
    pub async fn plan(&self) -> Result<SyncPlan, PlanError> {
        let local_files = collect_files(&self.local_root)?;

        let list_prefix = if self.remote_prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.remote_prefix)
        };
        let listing = self.store.list(&list_prefix).await?;

        let mut remote: BTreeMap<String, String> = listing
            .objects
            .iter()
            .map(|object| (object.key.as_str().to_string(), object.etag.clone()))
            .collect();

        let mut plan = SyncPlan::new();
        plan.total_source_files = local_files.len();
        plan.total_remote_files = listing.objects.len();
        plan.remote_listing_completed = listing.completed;

        for relative in &local_files {
            let key = ObjectKey::under_prefix(&self.remote_prefix, &slash_path(relative))?;
            let local_path = self.local_root.join(relative);

            match remote.remove(key.as_str()) {
                Some(remote_etag) => {
                    let local_etag = fingerprint_file(&local_path, self.part_size).await?;
                    if etags_match(&local_etag, &remote_etag) {
                        plan.skip.push(SkipRequest { key });
                    } else {
                        plan.update.push(UpdateRequest { local_path, key });
                    }
                }
                None => plan.add.push(AddRequest { local_path, key }),
            }
        }

        // Anything left in the remote map has no local counterpart.
        for key in remote.into_keys() {
            plan.delete.push(DeleteRequest {
                key: ObjectKey::new(key)?,
            });
        }

        tracing::info!(
            plan_id = %plan.plan_id,
            add = plan.add.len(),
            update = plan.update.len(),
            delete = plan.delete.len(),
            skip = plan.skip.len(),
            listing_completed = plan.remote_listing_completed,
            "sync plan computed"
        );
        Ok(plan)
    }
}

/// Collect every file under `root` as a sorted list of relative paths.
///
/// A missing root yields the empty set: an empty or misconfigured build
/// output is the validator's problem, not a planning error.
fn collect_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if root.is_dir() {
        walk(root, root, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn walk(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk(root, &path, files)?;
        } else {
            let relative = path
                .strip_prefix(root)
                .expect("walked paths live under the walk root");
            files.push(relative.to_path_buf());
        }
    }
    Ok(())
}

/// Render a relative path with `/` separators regardless of platform.
fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

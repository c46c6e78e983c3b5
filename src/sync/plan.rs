//! sync::plan
//!
//! The sync plan data model.
//!
//! # Architecture
//!
//! A plan is the sole intermediate representation between the computed
//! local/remote diff and any mutation of the remote store.
//!
//! Plans are:
//! - **Deterministic**: the same local tree and remote listing always
//!   produce the same plan
//! - **Previewable**: renderable for inspection before any side effect
//! - **Serializable**: a versioned JSON document that can cross a
//!   process boundary (plan in one CI job, apply in a later one)
//! - **Partitioned**: every remote key and every local file appears in
//!   exactly one of the four request lists
//!
//! # Invariants
//!
//! - `add.len() + update.len() + skip.len() == total_source_files`
//! - `update.len() + delete.len() + skip.len() == total_remote_files`
//! - A plan with `remote_listing_completed == false` never validates

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::core::types::ObjectKey;

/// Serialized plan format version.
pub const PLAN_FORMAT_VERSION: u32 = 1;

/// Upload a local file absent from the remote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddRequest {
    /// Local file to upload.
    pub local_path: PathBuf,
    /// Destination key.
    pub key: ObjectKey,
}

/// Re-upload a local file whose remote fingerprint differs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Local file to upload.
    pub local_path: PathBuf,
    /// Destination key.
    pub key: ObjectKey,
}

/// Delete a remote object with no local counterpart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteRequest {
    /// Key to delete.
    pub key: ObjectKey,
}

/// A file present on both sides with matching fingerprints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkipRequest {
    /// The unchanged key.
    pub key: ObjectKey,
}

/// Errors from decoding a serialized plan.
#[derive(Debug, Error)]
pub enum PlanDecodeError {
    /// The document's format version is not supported.
    #[error("unsupported plan format version {found}, expected {PLAN_FORMAT_VERSION}")]
    UnsupportedVersion {
        /// The version found in the document.
        found: u32,
    },

    /// The document is not valid JSON for the plan schema.
    #[error("cannot parse plan: {0}")]
    Json(#[from] serde_json::Error),
}

/// A categorized change plan against the remote store.
///
/// Constructed once by the planner, optionally serialized, consumed
/// exactly once by the applier after validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncPlan {
    /// Serialized format version.
    pub version: u32,
    /// Unique plan identifier.
    pub plan_id: String,
    /// When the plan was computed.
    pub created_at: DateTime<Utc>,
    /// Files to upload that have no remote counterpart.
    pub add: Vec<AddRequest>,
    /// Files whose content differs from the remote copy.
    pub update: Vec<UpdateRequest>,
    /// Remote objects with no local counterpart.
    pub delete: Vec<DeleteRequest>,
    /// Files unchanged on both sides.
    pub skip: Vec<SkipRequest>,
    /// Total local files examined.
    pub total_source_files: usize,
    /// Total remote objects listed.
    pub total_remote_files: usize,
    /// Whether the remote listing ran to completion.
    pub remote_listing_completed: bool,
}

impl SyncPlan {
    /// Create an empty plan shell with a fresh identifier.
    pub fn new() -> Self {
        Self {
            version: PLAN_FORMAT_VERSION,
            plan_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            add: vec![],
            update: vec![],
            delete: vec![],
            skip: vec![],
            total_source_files: 0,
            total_remote_files: 0,
            remote_listing_completed: false,
        }
    }

    /// Whether the plan proposes no mutation at all.
    pub fn is_noop(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    /// Number of mutation requests (adds, updates, deletes).
    pub fn mutation_count(&self) -> usize {
        self.add.len() + self.update.len() + self.delete.len()
    }

    /// The fraction of remote files this plan proposes to delete.
    pub fn delete_ratio(&self) -> f64 {
        self.delete.len() as f64 / self.total_remote_files.max(1) as f64
    }

    /// Serialize to the versioned JSON document.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("plans contain only serializable data")
    }

    /// Decode a serialized plan, rejecting unsupported versions.
    ///
    /// Callers must re-validate the decoded plan before applying it;
    /// decoding checks the format, not the safety gates.
    pub fn from_json(raw: &str) -> Result<Self, PlanDecodeError> {
        let plan: SyncPlan = serde_json::from_str(raw)?;
        if plan.version != PLAN_FORMAT_VERSION {
            return Err(PlanDecodeError::UnsupportedVersion {
                found: plan.version,
            });
        }
        Ok(plan)
    }

    /// Compute a digest of the plan for integrity checking.
    ///
    /// SHA-256 of the canonical JSON serialization; two structurally
    /// identical plans share a digest.
    pub fn digest(&self) -> String {
        let json = serde_json::to_string(self).expect("plans contain only serializable data");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }

    /// Generate a preview string for inspection before apply.
    pub fn preview(&self) -> String {
        if self.is_noop() {
            return format!(
                "plan {}: no changes ({} files in sync)",
                self.plan_id,
                self.skip.len()
            );
        }
        let mut lines = vec![format!("plan {}:", self.plan_id)];
        lines.push(format!("  add:    {}", self.add.len()));
        lines.push(format!("  update: {}", self.update.len()));
        lines.push(format!("  delete: {}", self.delete.len()));
        lines.push(format!("  skip:   {}", self.skip.len()));
        if !self.remote_listing_completed {
            lines.push("  WARNING: remote listing incomplete".to_string());
        }
        lines.join("\n")
    }
}

impl Default for SyncPlan {
    fn default() -> Self {
        Self::new()
    }
}

//! sync::validate
//!
//! Safety gating for sync plans.
//!
//! # Architecture
//!
//! Validation is deliberately separate from planning and from applying,
//! so a plan can be inspected, serialized, and shipped between process
//! invocations before any side effect. The applier re-runs validation
//! itself; a plan that fails the gate is never partially applied.
//!
//! # Gates
//!
//! - **Complete listing**: a plan computed against an interrupted
//!   remote listing is always invalid, regardless of its delete ratio.
//!   An incomplete listing makes every remote-only key invisible, and
//!   invisible keys would otherwise read as safe.
//! - **Delete ratio**: the fraction of currently published files a plan
//!   proposes to delete is bounded by a configurable threshold. This is
//!   the circuit-breaker for a misconfigured output prefix or an
//!   accidental near-empty build: such mistakes manifest as mass
//!   deletion, and the gate caps the blast radius at the plan level
//!   because batches below it are not atomic across one another.

use thiserror::Error;

use super::plan::SyncPlan;

/// Default bound on the deletable fraction of remote files.
pub const DEFAULT_DELETE_RATIO_THRESHOLD: f64 = 0.1;

/// Errors from plan validation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// The remote listing did not run to completion.
    #[error("plan was computed against an incomplete remote listing")]
    ListingIncomplete,

    /// The plan deletes more than the allowed fraction of remote files.
    #[error(
        "plan deletes {deletes} of {remote_files} remote files \
         (ratio {ratio:.3} exceeds threshold {threshold:.3})"
    )]
    DeleteRatioExceeded {
        /// Number of delete requests.
        deletes: usize,
        /// Total remote files the plan saw.
        remote_files: usize,
        /// The computed delete ratio.
        ratio: f64,
        /// The configured threshold.
        threshold: f64,
    },
}

/// Validates plans against the safety gates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanValidator {
    /// Maximum fraction of remote files a plan may delete.
    pub delete_ratio_threshold: f64,
}

impl PlanValidator {
    /// Create a validator with the given delete ratio threshold.
    pub fn new(delete_ratio_threshold: f64) -> Self {
        Self {
            delete_ratio_threshold,
        }
    }

    /// Check a plan against every gate.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::ListingIncomplete`] always wins over the
    ///   ratio check; an unverified remote state cannot be reasoned
    ///   about at all
    /// - [`ValidationError::DeleteRatioExceeded`] when the delete
    ///   fraction is above the threshold
    pub fn validate(&self, plan: &SyncPlan) -> Result<(), ValidationError> {
        if !plan.remote_listing_completed {
            return Err(ValidationError::ListingIncomplete);
        }

        let ratio = plan.delete_ratio();
        if ratio > self.delete_ratio_threshold {
            return Err(ValidationError::DeleteRatioExceeded {
                deletes: plan.delete.len(),
                remote_files: plan.total_remote_files,
                ratio,
                threshold: self.delete_ratio_threshold,
            });
        }

        Ok(())
    }
}

impl Default for PlanValidator {
    fn default() -> Self {
        Self::new(DEFAULT_DELETE_RATIO_THRESHOLD)
    }
}

//! sync
//!
//! The plan / validate / apply pipeline against the object store.
//!
//! # Lifecycle
//!
//! 1. [`planner::SyncPlanner`] diffs the local build output against the
//!    full remote listing into a categorized [`plan::SyncPlan`]
//! 2. [`validate::PlanValidator`] gates the plan: incomplete listings
//!    and excessive delete ratios never reach the store
//! 3. [`apply::SyncApplier`] executes a validated plan with bounded
//!    concurrency, batched deletes, and per-key failure collection
//!
//! Planning fully completes before any apply step begins, and a plan
//! may cross a process boundary as a versioned JSON document between
//! steps 1 and 3; the applier re-validates whatever it is handed.

pub mod apply;
pub mod etag;
pub mod plan;
pub mod planner;
pub mod validate;

pub use apply::{ApplyError, ApplyFailure, ApplySummary, SyncApplier};
pub use plan::{AddRequest, DeleteRequest, SkipRequest, SyncPlan, UpdateRequest};
pub use planner::{PlanError, SyncPlanner};
pub use validate::{PlanValidator, ValidationError, DEFAULT_DELETE_RATIO_THRESHOLD};

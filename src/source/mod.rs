//! source
//!
//! Git working-copy acquisition.
//!
//! # Architecture
//!
//! [`git::GitCli`] is the single doorway to the `git` binary: every
//! clone, fetch, checkout, and sparse-checkout command flows through it
//! with typed errors, bounded retries for output capture, and
//! cancellation support. [`sourcer::RepositorySourcer`] drives it to
//! acquire or update one working copy per configured repository, with
//! per-repository locks ([`lock::WorkDirLock`]) so updates and fresh
//! checkouts never race for the same directory.
//!
//! A repository that cannot be acquired is recorded as a diagnostic and
//! excluded from the rest of the build; its siblings continue.

pub mod git;
pub mod lock;
pub mod sourcer;

pub use git::{GitCli, GitError};
pub use lock::{LockError, WorkDirLock};
pub use sourcer::{Checkout, RepositorySourcer, SourceError};

//! source::lock
//!
//! Per-repository working-directory lock.
//!
//! # Design
//!
//! The working-copy directories are one of the two mutable shared
//! resources in the system (the manifest cache is the other). Each is
//! keyed by repository name and must be touched by a single task at a
//! time: an update and a fresh checkout racing for the same directory
//! leave it in a state neither expects.
//!
//! The lock is an OS-level exclusive file lock via `fs2`, so it also
//! protects against a second bindery process on the same machine.
//! Acquisition is non-blocking and fails fast.
//!
//! # Invariants
//!
//! - Held for the entire acquisition of one working copy
//! - Released automatically on drop (RAII)
//! - Scoped per repository name, not globally

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::types::RepositoryName;

/// Directory under the checkouts root holding lock files.
const LOCKS_DIR: &str = ".locks";

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another task or process holds the lock for this repository.
    #[error("working copy of '{repository}' is locked by another process")]
    AlreadyLocked {
        /// The repository whose lock is held.
        repository: String,
    },

    /// The lock file could not be created.
    #[error("cannot create lock file: {0}")]
    CreateFailed(String),

    /// The OS lock could not be acquired.
    #[error("cannot acquire lock: {0}")]
    AcquireFailed(String),
}

/// An exclusive lock on one repository's working directory.
///
/// Released when dropped.
#[derive(Debug)]
pub struct WorkDirLock {
    path: PathBuf,
    file: Option<File>,
}

impl WorkDirLock {
    /// Acquire the lock for a repository under the given checkouts root.
    ///
    /// Non-blocking: returns [`LockError::AlreadyLocked`] immediately
    /// when the lock is held elsewhere.
    pub fn acquire(checkouts_root: &Path, repository: &RepositoryName) -> Result<Self, LockError> {
        let locks_dir = checkouts_root.join(LOCKS_DIR);
        fs::create_dir_all(&locks_dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", locks_dir.display(), e))
        })?;

        let path = locks_dir.join(format!("{}.lock", repository));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked {
                repository: repository.to_string(),
            }),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Whether this guard still holds the lock.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// The lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock early; also happens on drop.
    pub fn release(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

impl Drop for WorkDirLock {
    fn drop(&mut self) {
        self.release();
    }
}

//! source::sourcer
//!
//! Acquires working copies for every configured repository.
//!
//! # Concurrency
//!
//! Acquisitions run in parallel, one task per repository, bounded by
//! processor count. No repository's acquisition depends on another's
//! completing, and acquisition order is unspecified.
//!
//! # Failure Isolation
//!
//! A repository whose acquisition fails after retries is recorded as a
//! diagnostic error and excluded from the remainder of the build. Its
//! siblings continue; one archived or misconfigured repository never
//! takes the whole publish pass down.
//!
//! # Update Strategy
//!
//! An existing working copy is updated in place (fetch, checkout,
//! merge with the unrelated-history allowance that shallow clones
//! need). Any update failure falls back to deleting the directory and
//! checking out fresh; working copies are caches, not state.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::git::{authenticated_origin, GitCli, GitError};
use super::lock::{LockError, WorkDirLock};
use crate::core::config::{CheckoutStrategy, Repository};
use crate::core::diagnostics::DiagnosticsCollector;
use crate::core::retry::RetryPolicy;
use crate::core::types::{CommitId, ContentSource};

/// Errors from acquiring one repository.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A git command failed after retries.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The working directory lock is held elsewhere.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Filesystem manipulation of the working directory failed.
    #[error("working directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// A successfully acquired working copy.
///
/// The head commit is the stable reference recorded into the metadata
/// of every generated page from this repository.
#[derive(Debug, Clone)]
pub struct Checkout {
    /// The repository this working copy belongs to.
    pub repository: Repository,
    /// Working copy directory.
    pub directory: PathBuf,
    /// Resolved head commit.
    pub head: CommitId,
}

/// Acquires and updates local working copies.
pub struct RepositorySourcer {
    checkouts_root: PathBuf,
    docs_dir: String,
    concurrency: usize,
    auth_token: Option<String>,
    retry: RetryPolicy,
}

impl RepositorySourcer {
    /// Create a sourcer rooted at the given checkouts directory.
    ///
    /// `docs_dir` is the repository subdirectory that partial checkouts
    /// narrow to.
    pub fn new(checkouts_root: impl Into<PathBuf>, docs_dir: impl Into<String>) -> Self {
        Self {
            checkouts_root: checkouts_root.into(),
            docs_dir: docs_dir.into(),
            concurrency: num_cpus::get(),
            auth_token: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the acquisition concurrency bound.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Provide an OAuth2 bearer token for private https origins.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Override the retry policy for output-capturing git commands.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Acquire every configured, non-skipped repository at the branch
    /// selected by `source`.
    ///
    /// Failures are recorded in `diagnostics` per repository; the
    /// returned checkouts cover the repositories that succeeded.
    pub async fn acquire_all(
        &self,
        repositories: &[Repository],
        source: ContentSource,
        cancel: &CancellationToken,
        diagnostics: &DiagnosticsCollector,
    ) -> Vec<Checkout> {
        let git = GitCli::new(self.retry, cancel.clone());

        let results: Vec<(String, Result<Checkout, SourceError>)> =
            stream::iter(repositories.iter().filter(|r| !r.skip))
                .map(|repository| {
                    let git = git.clone();
                    async move {
                        let name = repository.name.to_string();
                        let result = self.acquire(&git, repository, source).await;
                        (name, result)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut checkouts = Vec::new();
        for (name, result) in results {
            match result {
                Ok(checkout) => {
                    tracing::info!(
                        repository = %name,
                        head = %checkout.head.short(12),
                        "working copy ready"
                    );
                    checkouts.push(checkout);
                }
                Err(error) => {
                    diagnostics.error(&name, format!("checkout failed: {}", error));
                }
            }
        }
        checkouts
    }

    /// Acquire or update a single working copy.
    pub async fn acquire(
        &self,
        git: &GitCli,
        repository: &Repository,
        source: ContentSource,
    ) -> Result<Checkout, SourceError> {
        let branch = repository.branch_for(source);
        let directory = self.checkouts_root.join(repository.name.as_str());
        let _lock = WorkDirLock::acquire(&self.checkouts_root, &repository.name)?;

        let origin = match (&self.auth_token, repository.private) {
            (Some(token), true) => authenticated_origin(&repository.origin, token),
            _ => repository.origin.clone(),
        };

        if directory.is_dir() {
            match self.update(git, &directory, branch).await {
                Ok(()) => {}
                Err(error) => {
                    tracing::warn!(
                        repository = %repository.name,
                        %error,
                        "update failed, falling back to fresh checkout"
                    );
                    tokio::fs::remove_dir_all(&directory).await?;
                    self.fresh_checkout(git, repository, &origin, branch, &directory)
                        .await?;
                }
            }
        } else {
            self.fresh_checkout(git, repository, &origin, branch, &directory)
                .await?;
        }

        let head = git.head_commit(&directory).await?;
        Ok(Checkout {
            repository: repository.clone(),
            directory,
            head,
        })
    }

    /// Update an existing working copy in place.
    async fn update(&self, git: &GitCli, directory: &Path, branch: &str) -> Result<(), GitError> {
        git.fetch(directory, branch).await?;
        git.checkout(directory, branch).await?;
        git.merge_fetched(directory, branch).await
    }

    /// Check out a repository from scratch per its strategy.
    async fn fresh_checkout(
        &self,
        git: &GitCli,
        repository: &Repository,
        origin: &str,
        branch: &str,
        directory: &Path,
    ) -> Result<(), GitError> {
        match repository.checkout_strategy {
            CheckoutStrategy::Full => git.clone_shallow(origin, branch, directory).await,
            CheckoutStrategy::Partial => {
                git.clone_blobless(origin, directory).await?;
                git.sparse_checkout_init(directory).await?;
                git.sparse_checkout_set(directory, &[&self.docs_dir]).await?;
                git.checkout(directory, branch).await?;
                // Checking out a branch can widen the cone; narrow it
                // back to the documentation subdirectory.
                git.sparse_checkout_set(directory, &[&self.docs_dir]).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PublishConfig;

    fn repository(name: &str, skip: bool) -> Repository {
        let config = PublishConfig::from_toml(&format!(
            "organization = \"acme\"\n[repositories.{}]\nskip = {}",
            name, skip
        ))
        .unwrap();
        config.repository(name).unwrap().clone()
    }

    #[tokio::test]
    async fn skipped_repositories_are_not_acquired() {
        let root = tempfile::TempDir::new().unwrap();
        let sourcer = RepositorySourcer::new(root.path(), "docs");
        let diagnostics = DiagnosticsCollector::new();

        let checkouts = sourcer
            .acquire_all(
                &[repository("skipped", true)],
                ContentSource::Current,
                &CancellationToken::new(),
                &diagnostics,
            )
            .await;

        assert!(checkouts.is_empty());
        // Skipping is configuration, not failure
        assert!(diagnostics.is_empty());
    }

    #[tokio::test]
    async fn unreachable_origin_is_a_diagnostic_not_a_panic() {
        let root = tempfile::TempDir::new().unwrap();
        let sourcer = RepositorySourcer::new(root.path(), "docs")
            .with_retry(RetryPolicy::none())
            .with_concurrency(2);
        let diagnostics = DiagnosticsCollector::new();

        // The default origin points at a host the test never reaches;
        // cloning from a nonexistent local path fails the same way.
        let mut repo = repository("ghost", false);
        repo.origin = root.path().join("no-such-origin").display().to_string();

        let checkouts = sourcer
            .acquire_all(
                &[repo],
                ContentSource::Current,
                &CancellationToken::new(),
                &diagnostics,
            )
            .await;

        assert!(checkouts.is_empty());
        assert!(diagnostics.is_fatal());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn source_error_display() {
        let err = SourceError::Git(GitError::Cancelled);
        assert!(err.to_string().contains("cancelled"));

        let err = SourceError::Lock(LockError::AlreadyLocked {
            repository: "kibana".to_string(),
        });
        assert!(err.to_string().contains("kibana"));
    }
}

//! links::registry
//!
//! Client for the remote link registry.
//!
//! # Design
//!
//! The registry is read-only within a build. The root document is
//! fetched at most once per process and cached in memory for the
//! process lifetime; manifests are fetched on demand and cached on
//! disk keyed by (repository, branch, ETag), so an unchanged manifest
//! never crosses the network twice.
//!
//! # Failure Classes
//!
//! - [`RegistryError::Unavailable`]: the registry root cannot be
//!   retrieved. Fatal for any operation depending on cross-link
//!   resolution; recoverable by retrying the next invocation.
//! - [`RegistryError::RepositoryNotPublished`]: the target repository
//!   has no entry for `main` or `master`. Isolated to that repository.
//! - [`RegistryError::ManifestFetch`]: the entry exists but the
//!   manifest itself cannot be retrieved or parsed. Also isolated.

use thiserror::Error;
use tokio::sync::OnceCell;

use super::cache::ManifestCache;
use super::manifest::{LinkRegistry, LinkRegistryEntry, RepositoryLinks};

/// Location of the registry root document under the registry base URL.
const REGISTRY_INDEX_PATH: &str = "link-index.json";

/// Branches a manifest is looked up under, in preference order.
const MANIFEST_BRANCHES: [&str; 2] = ["main", "master"];

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry root document cannot be retrieved.
    #[error("link registry unavailable: {0}")]
    Unavailable(String),

    /// The repository has never published a manifest for a default branch.
    #[error("repository '{repository}' has not published a link manifest for main or master")]
    RepositoryNotPublished {
        /// The repository that was looked up.
        repository: String,
    },

    /// The registry names a manifest that cannot be retrieved or parsed.
    #[error("cannot fetch link manifest for '{repository}': {message}")]
    ManifestFetch {
        /// The repository whose manifest failed.
        repository: String,
        /// Description of the failure.
        message: String,
    },
}

/// Client for the remote link registry.
pub struct LinkRegistryClient {
    /// HTTP client for registry and manifest requests.
    http: reqwest::Client,
    /// Registry base URL.
    base_url: String,
    /// On-disk manifest cache.
    cache: ManifestCache,
    /// Root document, fetched at most once per process.
    registry: OnceCell<LinkRegistry>,
}

impl LinkRegistryClient {
    /// Create a client against the given registry base URL.
    pub fn new(base_url: impl Into<String>, cache: ManifestCache) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache,
            registry: OnceCell::new(),
        }
    }

    /// The registry base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the registry root document.
    ///
    /// The first successful fetch is cached for the process lifetime;
    /// subsequent calls are free.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unavailable`] when the document cannot be
    /// retrieved or parsed.
    pub async fn fetch_registry(&self) -> Result<&LinkRegistry, RegistryError> {
        self.registry
            .get_or_try_init(|| async {
                let url = format!("{}/{}", self.base_url, REGISTRY_INDEX_PATH);
                tracing::debug!(%url, "fetching link registry");
                let response = self
                    .http
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| RegistryError::Unavailable(e.to_string()))?;
                if !response.status().is_success() {
                    return Err(RegistryError::Unavailable(format!(
                        "{} returned {}",
                        url,
                        response.status()
                    )));
                }
                response
                    .json::<LinkRegistry>()
                    .await
                    .map_err(|e| RegistryError::Unavailable(e.to_string()))
            })
            .await
    }

    /// Fetch the link manifest for a repository.
    ///
    /// The manifest is looked up under `main`, falling back to
    /// `master`. The on-disk cache is consulted before the network.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Unavailable`] when the registry root is gone
    /// - [`RegistryError::RepositoryNotPublished`] when no default
    ///   branch has an entry
    /// - [`RegistryError::ManifestFetch`] when the manifest itself
    ///   cannot be retrieved
    pub async fn fetch_manifest(
        &self,
        repository: &str,
    ) -> Result<(RepositoryLinks, LinkRegistryEntry), RegistryError> {
        let registry = self.fetch_registry().await?;
        let entry = select_entry(registry, repository)?.clone();

        if let Some(cached) = self.cache.get(repository, &entry.branch, &entry.etag) {
            tracing::debug!(repository, branch = %entry.branch, "manifest cache hit");
            return Ok((cached, entry));
        }

        let url = format!("{}/{}", self.base_url, entry.path.trim_start_matches('/'));
        tracing::debug!(repository, %url, "fetching link manifest");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RegistryError::ManifestFetch {
                repository: repository.to_string(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(RegistryError::ManifestFetch {
                repository: repository.to_string(),
                message: format!("{} returned {}", url, response.status()),
            });
        }
        let links = response
            .json::<RepositoryLinks>()
            .await
            .map_err(|e| RegistryError::ManifestFetch {
                repository: repository.to_string(),
                message: e.to_string(),
            })?;

        self.cache.put(repository, &entry.branch, &entry.etag, &links);
        Ok((links, entry))
    }
}

/// Select the registry entry for a repository, preferring `main` over
/// `master`.
fn select_entry<'a>(
    registry: &'a LinkRegistry,
    repository: &str,
) -> Result<&'a LinkRegistryEntry, RegistryError> {
    MANIFEST_BRANCHES
        .iter()
        .find_map(|branch| registry.entry(repository, branch))
        .ok_or_else(|| RegistryError::RepositoryNotPublished {
            repository: repository.to_string(),
        })
}

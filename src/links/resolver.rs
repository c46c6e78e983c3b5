//! links::resolver
//!
//! Cross-link resolution against an immutable per-build snapshot.
//!
//! # Snapshot Semantics
//!
//! [`FetchedCrossLinks`] is built once per build invocation and treated
//! as immutable for that invocation. Every page rendered in one build
//! resolves links against the same snapshot; no page ever observes a
//! different registry state than another.
//!
//! One narrow exception exists: a repository validating its own links
//! before publishing may override its own entry with locally built,
//! not-yet-published link data. [`FetchedCrossLinks::with_link_reference`]
//! produces a new snapshot value for that; nothing is ever mutated in
//! place.
//!
//! # URL Rules
//!
//! The preview environment resolves paths unprefixed. Every other
//! environment prepends its path prefix and the longest configured
//! table-of-contents prefix matching the link, so more specific
//! prefixes win over general ones.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use super::manifest::{LinkRegistryEntry, RepositoryLinks};
use super::registry::{LinkRegistryClient, RegistryError};
use super::uri::CrossLinkUri;
use crate::core::config::Environment;
use crate::core::diagnostics::DiagnosticsCollector;

/// Errors from resolving a single cross-link.
///
/// These are per-link diagnostics: the validation driver collects them
/// and continues; a broken link never aborts resolution of its
/// neighbors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The URI's scheme names a repository outside the snapshot.
    #[error("unknown repository '{repository}'")]
    UnknownRepository {
        /// The repository the scheme named.
        repository: String,
    },

    /// The target repository's manifest has no such page.
    #[error("repository '{repository}' has no page '{path}'")]
    PathNotFound {
        /// The target repository.
        repository: String,
        /// The page path that was looked up.
        path: String,
    },

    /// The page exists but lacks the requested anchor.
    #[error("page '{path}' in repository '{repository}' has no anchor '{anchor}'")]
    AnchorNotFound {
        /// The target repository.
        repository: String,
        /// The page path.
        path: String,
        /// The missing anchor.
        anchor: String,
    },
}

/// Aggregate snapshot of all link state one build resolves against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedCrossLinks {
    /// Repositories declared as cross-link targets for this build.
    pub declared_repositories: BTreeSet<String>,
    /// Fetched manifests by repository.
    pub link_references: BTreeMap<String, RepositoryLinks>,
    /// Registry entries by repository, recording ETag provenance.
    pub link_index_entries: BTreeMap<String, LinkRegistryEntry>,
}

impl FetchedCrossLinks {
    /// An empty snapshot; resolves nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fetch a snapshot for the declared repositories.
    ///
    /// Failures isolated to one repository (unpublished manifest, fetch
    /// error) are reported to `diagnostics` and exclude that repository
    /// from the snapshot; siblings continue. An unavailable registry is
    /// fatal and propagates.
    pub async fn fetch(
        client: &LinkRegistryClient,
        declared: impl IntoIterator<Item = String>,
        diagnostics: &DiagnosticsCollector,
    ) -> Result<Self, RegistryError> {
        let declared_repositories: BTreeSet<String> = declared.into_iter().collect();

        // Surface registry unavailability before iterating; that class
        // of failure is fatal for the whole resolution step.
        client.fetch_registry().await?;

        let mut link_references = BTreeMap::new();
        let mut link_index_entries = BTreeMap::new();
        for repository in &declared_repositories {
            match client.fetch_manifest(repository).await {
                Ok((links, entry)) => {
                    link_references.insert(repository.clone(), links);
                    link_index_entries.insert(repository.clone(), entry);
                }
                Err(RegistryError::Unavailable(message)) => {
                    return Err(RegistryError::Unavailable(message));
                }
                Err(err) => {
                    diagnostics.error(repository.clone(), err.to_string());
                }
            }
        }

        Ok(Self {
            declared_repositories,
            link_references,
            link_index_entries,
        })
    }

    /// Produce a new snapshot with one repository's manifest replaced by
    /// caller-supplied link data.
    ///
    /// Used to validate a repository's own outbound and inbound links
    /// against its freshly built, not-yet-published manifest, without
    /// waiting for the registry to catch up.
    pub fn with_link_reference(
        &self,
        repository: impl Into<String>,
        links: RepositoryLinks,
    ) -> Self {
        let repository = repository.into();
        let mut snapshot = self.clone();
        snapshot.declared_repositories.insert(repository.clone());
        snapshot.link_references.insert(repository, links);
        snapshot
    }
}

/// Environment-specific URL prefix rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPrefixRules {
    /// Resolve paths unprefixed; the preview behavior.
    Passthrough,
    /// Prepend the environment prefix and the matched TOC prefix.
    Prefixed {
        /// Environment URL prefix, without surrounding slashes.
        environment_prefix: String,
        /// Configured TOC prefixes; longest match wins.
        toc_prefixes: Vec<String>,
    },
}

impl UrlPrefixRules {
    /// Build the rules for a deployment environment.
    pub fn for_environment(environment: &Environment, toc_prefixes: &[String]) -> Self {
        if environment.is_passthrough() {
            UrlPrefixRules::Passthrough
        } else {
            UrlPrefixRules::Prefixed {
                environment_prefix: environment.path_prefix.clone(),
                toc_prefixes: toc_prefixes.to_vec(),
            }
        }
    }

    /// The longest configured TOC prefix matching the candidate path,
    /// on component boundaries.
    pub fn toc_source_for(&self, candidate: &str) -> Option<&str> {
        let UrlPrefixRules::Prefixed { toc_prefixes, .. } = self else {
            return None;
        };
        toc_prefixes
            .iter()
            .filter(|prefix| {
                let prefix = prefix.trim_matches('/');
                candidate == prefix
                    || candidate
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|prefix| prefix.len())
            .map(String::as_str)
    }

    /// Apply the rules to a site-relative candidate path.
    fn apply(&self, candidate: &str) -> String {
        match self {
            UrlPrefixRules::Passthrough => format!("/{}", candidate),
            UrlPrefixRules::Prefixed {
                environment_prefix, ..
            } => match self.toc_source_for(candidate) {
                Some(toc_source) => {
                    let toc_source = toc_source.trim_matches('/');
                    let rest = candidate
                        .strip_prefix(toc_source)
                        .unwrap_or("")
                        .trim_start_matches('/');
                    if rest.is_empty() {
                        format!("/{}/{}", environment_prefix, toc_source)
                    } else {
                        format!("/{}/{}/{}", environment_prefix, toc_source, rest)
                    }
                }
                None => format!("/{}/{}", environment_prefix, candidate),
            },
        }
    }
}

/// Resolves cross-link URIs into concrete site URLs.
///
/// Holds one snapshot and one set of URL rules; both are immutable.
/// The resolver is safe for unsynchronized concurrent reads.
#[derive(Debug, Clone)]
pub struct CrossLinkResolver {
    snapshot: FetchedCrossLinks,
    rules: UrlPrefixRules,
}

impl CrossLinkResolver {
    /// Create a resolver over a snapshot and environment rules.
    pub fn new(snapshot: FetchedCrossLinks, rules: UrlPrefixRules) -> Self {
        Self { snapshot, rules }
    }

    /// The snapshot this resolver reads.
    pub fn snapshot(&self) -> &FetchedCrossLinks {
        &self.snapshot
    }

    /// A resolver over a new snapshot with one repository's manifest
    /// replaced by local, not-yet-published link data.
    pub fn with_link_reference(
        &self,
        repository: impl Into<String>,
        links: RepositoryLinks,
    ) -> Self {
        Self {
            snapshot: self.snapshot.with_link_reference(repository, links),
            rules: self.rules.clone(),
        }
    }

    /// Resolve one cross-link into a site URL.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::UnknownRepository`] when the scheme repository
    ///   is not in the snapshot
    /// - [`ResolveError::PathNotFound`] when the manifest has no such
    ///   page (after following a redirect, when one exists)
    /// - [`ResolveError::AnchorNotFound`] when the page lacks the
    ///   requested anchor
    pub fn resolve(&self, uri: &CrossLinkUri) -> Result<String, ResolveError> {
        if !self
            .snapshot
            .declared_repositories
            .contains(&uri.repository)
        {
            return Err(ResolveError::UnknownRepository {
                repository: uri.repository.clone(),
            });
        }
        let links = self.snapshot.link_references.get(&uri.repository).ok_or(
            ResolveError::UnknownRepository {
                repository: uri.repository.clone(),
            },
        )?;

        // The manifest's exact page wins; a redirect entry gets one
        // chance to send us to the moved location.
        let mut path = uri.path.clone();
        if links.page(&path).is_none() {
            if let Some(target) = links.redirect_for(&path) {
                path = target.to_string();
            }
        }
        if links.page(&path).is_none() {
            return Err(ResolveError::PathNotFound {
                repository: uri.repository.clone(),
                path: uri.path.clone(),
            });
        }

        if let Some(anchor) = &uri.fragment {
            if !links.has_anchor(&path, anchor) {
                return Err(ResolveError::AnchorNotFound {
                    repository: uri.repository.clone(),
                    path: path.clone(),
                    anchor: anchor.clone(),
                });
            }
        }

        let page = path.strip_suffix(".md").unwrap_or(&path);
        let base = if links.url_path_prefix.is_empty() {
            uri.repository.as_str()
        } else {
            links.url_path_prefix.trim_matches('/')
        };
        let candidate = if page.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, page)
        };

        let mut url = self.rules.apply(&candidate);
        if let Some(anchor) = &uri.fragment {
            url.push('#');
            url.push_str(anchor);
        }
        Ok(url)
    }

    /// Resolve one cross-link, reporting failure to the diagnostics
    /// sink instead of returning it.
    ///
    /// Returns `None` on failure so a single unresolved link never
    /// aborts validation of the remaining links.
    pub fn resolve_or_report(
        &self,
        uri: &CrossLinkUri,
        scope: &str,
        diagnostics: &DiagnosticsCollector,
    ) -> Option<String> {
        match self.resolve(uri) {
            Ok(url) => Some(url),
            Err(err) => {
                diagnostics.error(scope, format!("{}: {}", uri, err));
                None
            }
        }
    }
}

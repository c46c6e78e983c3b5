//! links::manifest
//!
//! Wire types for the link registry and per-repository link manifests.
//!
//! # Wire Format
//!
//! The registry root document maps repository name to branch to an
//! entry carrying the manifest's location and ETag:
//!
//! ```json
//! {
//!   "repositories": {
//!     "kibana": {
//!       "main": { "path": "kibana/main/links.json", "branch": "main", "etag": "abc" }
//!     }
//!   }
//! }
//! ```
//!
//! A manifest describes one repository's publishable surface at one
//! commit: its origin, URL path prefix, every page with its anchors,
//! its outbound cross-links, and optional redirects for moved pages.
//!
//! All of these types are read-only within a build; they deserialize
//! from remote JSON and are never written back.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The registry root document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkRegistry {
    /// Repository name to branch to registry entry.
    #[serde(default)]
    pub repositories: BTreeMap<String, BTreeMap<String, LinkRegistryEntry>>,
}

impl LinkRegistry {
    /// Look up the entry for a repository and branch.
    pub fn entry(&self, repository: &str, branch: &str) -> Option<&LinkRegistryEntry> {
        self.repositories.get(repository)?.get(branch)
    }
}

/// One published manifest's location within the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkRegistryEntry {
    /// Manifest location relative to the registry root.
    pub path: String,
    /// Branch the manifest was published from.
    pub branch: String,
    /// ETag of the published manifest; cache key component.
    pub etag: String,
}

/// Provenance of a published manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkOrigin {
    /// Branch the manifest was built from.
    #[serde(default)]
    pub branch: String,
    /// Remote the branch was fetched from.
    #[serde(default)]
    pub remote: String,
    /// Commit the manifest was built at.
    #[serde(default, rename = "ref")]
    pub git_ref: String,
    /// Repository name.
    #[serde(default)]
    pub name: String,
}

/// The anchors of one publishable page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageLinks {
    /// Anchor ids present in the page.
    #[serde(default)]
    pub anchors: BTreeSet<String>,
}

/// A per-repository, per-branch link manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryLinks {
    /// Where the manifest was built from.
    #[serde(default)]
    pub origin: LinkOrigin,

    /// URL path prefix the repository's pages are published under.
    #[serde(default)]
    pub url_path_prefix: String,

    /// Publishable pages by path, each with its anchor set.
    #[serde(default)]
    pub links: BTreeMap<String, PageLinks>,

    /// Outbound cross-links declared by this repository.
    #[serde(default)]
    pub cross_links: Vec<String>,

    /// Redirects for moved pages, old path to new path.
    #[serde(default)]
    pub redirects: Option<BTreeMap<String, String>>,
}

impl RepositoryLinks {
    /// Look up a page, normalizing a trailing `.md` away.
    ///
    /// `guide/setup` and `guide/setup.md` address the same page
    /// regardless of which form the manifest recorded.
    pub fn page(&self, path: &str) -> Option<&PageLinks> {
        if let Some(page) = self.links.get(path) {
            return Some(page);
        }
        match path.strip_suffix(".md") {
            Some(stripped) => self.links.get(stripped),
            None => self.links.get(&format!("{}.md", path)),
        }
    }

    /// Whether the given page declares the given anchor.
    pub fn has_anchor(&self, path: &str, anchor: &str) -> bool {
        self.page(path)
            .map(|page| page.anchors.contains(anchor))
            .unwrap_or(false)
    }

    /// The redirect target for a moved page, if any.
    pub fn redirect_for(&self, path: &str) -> Option<&str> {
        let redirects = self.redirects.as_ref()?;
        if let Some(target) = redirects.get(path) {
            return Some(target);
        }
        match path.strip_suffix(".md") {
            Some(stripped) => redirects.get(stripped).map(String::as_str),
            None => redirects.get(&format!("{}.md", path)).map(String::as_str),
        }
    }
}

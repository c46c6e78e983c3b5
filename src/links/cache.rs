//! links::cache
//!
//! On-disk manifest cache keyed by (repository, branch, ETag).
//!
//! # Design
//!
//! Manifests are immutable once published: the ETag changes whenever the
//! content does. A cache hit for the exact (repository, branch, ETag)
//! triple therefore skips the network call entirely, with no revalidation
//! needed.
//!
//! The cache is an explicit object with a defined lifecycle: constructed
//! per process, pointed at a directory, never silently invalidated
//! mid-build. Tests inject a fresh or pre-seeded directory instead of
//! sharing ambient state.
//!
//! Cache writes are best-effort. A full disk or a read-only cache
//! directory slows fetches down; it never fails them.

use std::fs;
use std::path::{Path, PathBuf};

use super::manifest::RepositoryLinks;

/// On-disk manifest cache.
#[derive(Debug, Clone)]
pub struct ManifestCache {
    root: PathBuf,
}

impl ManifestCache {
    /// Create a cache rooted at the given directory.
    ///
    /// The directory is created lazily on the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The default per-user cache location.
    ///
    /// Falls back to a path under the temporary directory when the
    /// platform reports no cache directory.
    pub fn default_location() -> Self {
        let root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("bindery")
            .join("manifests");
        Self::new(root)
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a cached manifest for the exact (repository, branch, ETag)
    /// triple.
    ///
    /// Any read or parse failure is treated as a miss; a corrupt cache
    /// entry costs one re-fetch, nothing more.
    pub fn get(&self, repository: &str, branch: &str, etag: &str) -> Option<RepositoryLinks> {
        let path = self.entry_path(repository, branch, etag);
        let raw = fs::read_to_string(path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Write a manifest into the cache, best-effort.
    pub fn put(&self, repository: &str, branch: &str, etag: &str, links: &RepositoryLinks) {
        let path = self.entry_path(repository, branch, etag);
        if fs::create_dir_all(&self.root).is_err() {
            return;
        }
        if let Ok(raw) = serde_json::to_string(links) {
            if let Err(error) = fs::write(&path, raw) {
                tracing::debug!(
                    path = %path.display(),
                    %error,
                    "manifest cache write failed; continuing without cache"
                );
            }
        }
    }

    fn entry_path(&self, repository: &str, branch: &str, etag: &str) -> PathBuf {
        self.root.join(format!(
            "{}_{}_{}.json",
            sanitize(repository),
            sanitize(branch),
            sanitize(etag)
        ))
    }
}

/// Replace path-hostile characters in a cache key component.
fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::manifest::PageLinks;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample_links() -> RepositoryLinks {
        let mut links = BTreeMap::new();
        links.insert("index.md".to_string(), PageLinks::default());
        RepositoryLinks {
            links,
            ..RepositoryLinks::default()
        }
    }

    #[test]
    fn miss_on_empty_cache() {
        let dir = TempDir::new().unwrap();
        let cache = ManifestCache::new(dir.path());
        assert!(cache.get("kibana", "main", "etag1").is_none());
    }

    #[test]
    fn put_then_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = ManifestCache::new(dir.path());
        let links = sample_links();

        cache.put("kibana", "main", "etag1", &links);
        let cached = cache.get("kibana", "main", "etag1").unwrap();
        assert_eq!(cached, links);
    }

    #[test]
    fn different_etag_misses() {
        let dir = TempDir::new().unwrap();
        let cache = ManifestCache::new(dir.path());
        cache.put("kibana", "main", "etag1", &sample_links());

        assert!(cache.get("kibana", "main", "etag2").is_none());
        assert!(cache.get("kibana", "master", "etag1").is_none());
        assert!(cache.get("beats", "main", "etag1").is_none());
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ManifestCache::new(dir.path());
        cache.put("kibana", "main", "etag1", &sample_links());

        // Corrupt the entry on disk
        let entry = cache.entry_path("kibana", "main", "etag1");
        fs::write(&entry, "{not json").unwrap();

        assert!(cache.get("kibana", "main", "etag1").is_none());
    }

    #[test]
    fn write_failure_does_not_panic() {
        // Root is a file, so create_dir_all fails
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("occupied");
        fs::write(&blocker, "file").unwrap();

        let cache = ManifestCache::new(&blocker);
        cache.put("kibana", "main", "etag1", &sample_links());
        assert!(cache.get("kibana", "main", "etag1").is_none());
    }

    #[test]
    fn keys_with_hostile_characters_are_sanitized() {
        let dir = TempDir::new().unwrap();
        let cache = ManifestCache::new(dir.path());
        let links = sample_links();

        cache.put("kibana", "feature/sub", "\"quoted-etag\"", &links);
        let cached = cache.get("kibana", "feature/sub", "\"quoted-etag\"").unwrap();
        assert_eq!(cached, links);

        // Nothing escaped the cache root
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn lazy_root_creation() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("cache");
        let cache = ManifestCache::new(&root);
        assert!(!root.exists());

        cache.put("kibana", "main", "etag1", &sample_links());
        assert!(root.exists());
    }
}

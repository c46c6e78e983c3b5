//! store::memory
//!
//! In-memory object store for deterministic testing.
//!
//! # Design
//!
//! Stores objects in a map guarded by a mutex, computing the same ETag
//! fingerprint the planner computes locally, so a plan applied against
//! this store converges exactly like one applied against a real
//! backend. Failure scenarios are configurable per key, and listings
//! can be truncated to exercise the incomplete-pagination path.
//!
//! # Example
//!
//! ```
//! use bindery::core::types::ObjectKey;
//! use bindery::store::{InMemoryStore, ObjectStore};
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryStore::new();
//! store.seed("docs/index.html", b"<html/>");
//!
//! let listing = store.list("docs/").await.unwrap();
//! assert!(listing.completed);
//! assert_eq!(listing.objects.len(), 1);
//!
//! let outcome = store
//!     .delete_batch(&[ObjectKey::new("docs/index.html").unwrap()])
//!     .await
//!     .unwrap();
//! assert_eq!(outcome.deleted.len(), 1);
//! # });
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{
    BatchDeleteOutcome, DeleteFailure, ObjectListing, ObjectStore, RemoteObject, StoreError,
    MAX_DELETE_BATCH,
};
use crate::core::types::ObjectKey;
use crate::sync::etag::{fingerprint_bytes, DEFAULT_PART_SIZE};

/// A stored object: content fingerprint and size.
#[derive(Debug, Clone)]
struct StoredObject {
    etag: String,
    size: u64,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct InMemoryStoreInner {
    /// Objects by key.
    objects: BTreeMap<String, StoredObject>,
    /// Keys whose uploads fail.
    fail_puts: BTreeSet<String>,
    /// Keys whose deletes fail per-key.
    fail_deletes: BTreeSet<String>,
    /// Truncate listings after this many objects.
    truncate_listing_after: Option<usize>,
    /// Number of put requests served.
    put_count: usize,
    /// Number of delete batch requests served.
    delete_batch_count: usize,
    /// Recorded requests in arrival order, for test verification.
    operations: Vec<String>,
}

/// In-memory object store.
///
/// Thread-safe and cheaply cloneable; clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<InMemoryStoreInner>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object directly, bypassing the trait.
    ///
    /// # Panics
    ///
    /// Panics when `key` is not a valid object key; seeding happens in
    /// test setup where a bad key is a bug in the test.
    pub fn seed(&self, key: &str, content: &[u8]) {
        let key = ObjectKey::new(key).expect("seed keys must be valid object keys");
        let mut inner = self.lock();
        inner.objects.insert(
            key.as_str().to_string(),
            StoredObject {
                etag: fingerprint_bytes(content, DEFAULT_PART_SIZE),
                size: content.len() as u64,
            },
        );
    }

    /// Make uploads to the given key fail.
    pub fn fail_put(&self, key: &str) {
        self.lock().fail_puts.insert(key.to_string());
    }

    /// Make deletes of the given key fail per-key.
    pub fn fail_delete(&self, key: &str) {
        self.lock().fail_deletes.insert(key.to_string());
    }

    /// Truncate every listing after the given object count, reporting
    /// incomplete pagination.
    pub fn truncate_listing_after(&self, count: usize) {
        self.lock().truncate_listing_after = Some(count);
    }

    /// All stored keys.
    pub fn keys(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    /// Whether the store holds the given key.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().objects.contains_key(key)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of put requests served so far.
    pub fn put_count(&self) -> usize {
        self.lock().put_count
    }

    /// Number of delete batch requests served so far.
    pub fn delete_batch_count(&self) -> usize {
        self.lock().delete_batch_count
    }

    /// Recorded requests in arrival order (`put:<key>`,
    /// `delete-batch:<count>`).
    pub fn operations(&self) -> Vec<String> {
        self.lock().operations.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryStoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn list(&self, prefix: &str) -> Result<ObjectListing, StoreError> {
        let inner = self.lock();
        let mut objects: Vec<RemoteObject> = inner
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, stored)| RemoteObject {
                key: ObjectKey::new(key.clone())
                    .expect("stored keys are validated on insertion"),
                etag: stored.etag.clone(),
                size: stored.size,
            })
            .collect();

        let completed = match inner.truncate_listing_after {
            Some(limit) if objects.len() > limit => {
                objects.truncate(limit);
                false
            }
            _ => true,
        };

        Ok(ObjectListing { objects, completed })
    }

    async fn put_file(&self, key: &ObjectKey, source: &Path) -> Result<(), StoreError> {
        let content = tokio::fs::read(source).await?;
        let mut inner = self.lock();
        inner.put_count += 1;
        inner.operations.push(format!("put:{}", key));
        if inner.fail_puts.contains(key.as_str()) {
            return Err(StoreError::Backend(format!("upload rejected: {}", key)));
        }
        inner.objects.insert(
            key.as_str().to_string(),
            StoredObject {
                etag: fingerprint_bytes(&content, DEFAULT_PART_SIZE),
                size: content.len() as u64,
            },
        );
        Ok(())
    }

    async fn delete_batch(&self, keys: &[ObjectKey]) -> Result<BatchDeleteOutcome, StoreError> {
        if keys.len() > MAX_DELETE_BATCH {
            return Err(StoreError::BatchTooLarge(keys.len()));
        }
        let mut inner = self.lock();
        inner.delete_batch_count += 1;
        inner.operations.push(format!("delete-batch:{}", keys.len()));

        let mut outcome = BatchDeleteOutcome::default();
        for key in keys {
            if inner.fail_deletes.contains(key.as_str()) {
                outcome.failed.push(DeleteFailure {
                    key: key.clone(),
                    message: "access denied".to_string(),
                });
                continue;
            }
            // Deleting an absent key succeeds, matching store semantics.
            inner.objects.remove(key.as_str());
            outcome.deleted.push(key.clone());
        }
        Ok(outcome)
    }
}

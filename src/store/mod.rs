//! store
//!
//! Object-store abstraction.
//!
//! # Design
//!
//! The remote artifact store is reached exclusively through the
//! [`ObjectStore`] trait: list a prefix with pagination-completion
//! reporting, upload a file, delete a bounded batch of keys. The sync
//! pipeline never assumes a concrete backend.
//!
//! [`memory::InMemoryStore`] provides a deterministic implementation
//! for tests, including configurable failures and truncated listings.

pub mod memory;
pub mod traits;

pub use memory::InMemoryStore;
pub use traits::{
    BatchDeleteOutcome, DeleteFailure, ObjectListing, ObjectStore, RemoteObject, StoreError,
    MAX_DELETE_BATCH,
};

//! Bindery - multi-repository documentation assembly
//!
//! Bindery assembles documentation published across many independently
//! versioned source repositories into one coherent, deployable site. It
//! decides which branch of which repository currently represents a
//! publishable content source, resolves references between repositories
//! into concrete URLs, and computes a minimally destructive incremental
//! update to a remote artifact store.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`core`] - Domain types, configuration, diagnostics, retry policy
//! - [`matcher`] - Pure content-source classification for repository refs
//! - [`links`] - Link registry client, manifest cache, cross-link resolution
//! - [`source`] - Git working-copy acquisition
//! - [`store`] - Object-store abstraction
//! - [`sync`] - Plan / validate / apply pipeline against the object store
//!
//! # Correctness Invariants
//!
//! Bindery maintains the following invariants:
//!
//! 1. A sync plan partitions local and remote keys exactly; no key is
//!    counted twice and none is dropped
//! 2. Nothing is applied against a plan that fails validation
//! 3. One link snapshot serves an entire build invocation
//! 4. A failed repository never aborts its siblings

pub mod core;
pub mod links;
pub mod matcher;
pub mod source;
pub mod store;
pub mod sync;

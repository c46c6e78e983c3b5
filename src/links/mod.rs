//! links
//!
//! Link registry client, manifest cache, and cross-link resolution.
//!
//! # Architecture
//!
//! Every repository that publishes documentation also publishes a link
//! manifest: the set of its pages, their anchors, and its outbound
//! cross-links. A central registry maps repository and branch to the
//! manifest's location and ETag. This module fetches that registry
//! ([`registry`]), caches manifests on disk ([`cache`]), parses
//! cross-link URIs at the boundary ([`uri`]), and resolves them into
//! concrete site URLs against an immutable per-build snapshot
//! ([`resolver`]).
//!
//! # Consistency
//!
//! The snapshot is fetched once per build invocation. Every page
//! rendered in that invocation resolves links against the same state;
//! no page ever observes a different registry state than another.

pub mod cache;
pub mod manifest;
pub mod registry;
pub mod resolver;
pub mod uri;

pub use manifest::{LinkRegistry, LinkRegistryEntry, RepositoryLinks};
pub use registry::{LinkRegistryClient, RegistryError};
pub use resolver::{CrossLinkResolver, FetchedCrossLinks, ResolveError, UrlPrefixRules};
pub use uri::{CrossLinkUri, UriError};

//! matcher
//!
//! Content-source classification for repository refs.
//!
//! # Design
//!
//! [`ContentSourceMatcher::match_ref`] decides whether a repository and
//! branch-or-tag pair currently represents a publishable content source,
//! using only the static configuration. It is a pure function: no I/O,
//! no retries, identical inputs always produce identical results. The
//! surrounding automation calls it for every incoming push event, so a
//! misclassification here either publishes a branch that should stay
//! private or silently drops a release line.
//!
//! # Speculative matches
//!
//! A branch that is not explicitly configured may still be worth
//! building. Two heuristics apply:
//!
//! - A `major.minor` version branch at or above the repository's
//!   current version is built optimistically, so a freshly cut minor
//!   branch is published before configuration catches up.
//! - `main`/`master` of an unknown first-party repository, or of a known
//!   repository whose configured branches did not match, is built
//!   optimistically as a default-branch rule.
//!
//! Speculative is independent of the explicit matches: a branch can be
//! simultaneously `Next` and speculative. Consumers that only care about
//! explicit matches read the three source fields and ignore the flag.

use crate::core::config::PublishConfig;
use crate::core::types::{ContentSource, VersionBranch};

/// Default branch names matched by the last-resort rule.
const DEFAULT_BRANCHES: [&str; 2] = ["main", "master"];

/// The classification of one (repository, branch-or-tag) pair.
///
/// Produced per query and never persisted; always recomputed from the
/// current configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentSourceMatch {
    /// Set when the ref is the repository's stable branch.
    pub current: Option<ContentSource>,
    /// Set when the ref is the repository's upcoming branch.
    pub next: Option<ContentSource>,
    /// Set when the ref is the repository's development branch.
    pub edge: Option<ContentSource>,
    /// Set when a heuristic rule selected the ref for an optimistic build.
    pub speculative: bool,
}

impl ContentSourceMatch {
    /// The match with no fields set: the ref is not publishable.
    pub const EMPTY: ContentSourceMatch = ContentSourceMatch {
        current: None,
        next: None,
        edge: None,
        speculative: false,
    };

    /// Whether no rule matched at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Whether the given source matched explicitly.
    pub fn matches(&self, source: ContentSource) -> bool {
        match source {
            ContentSource::Current => self.current.is_some(),
            ContentSource::Next => self.next.is_some(),
            ContentSource::Edge => self.edge.is_some(),
        }
    }
}

/// Pure classifier over the static configuration.
pub struct ContentSourceMatcher<'a> {
    config: &'a PublishConfig,
}

impl<'a> ContentSourceMatcher<'a> {
    /// Create a matcher over the process configuration.
    pub fn new(config: &'a PublishConfig) -> Self {
        Self { config }
    }

    /// Classify a repository and branch-or-tag pair.
    ///
    /// `repository_full_name` is either `org/name` or a bare `name`;
    /// bare names are treated as owned by the configured organization,
    /// while a foreign organization always yields the empty match.
    pub fn match_ref(&self, repository_full_name: &str, branch_or_tag: &str) -> ContentSourceMatch {
        let short_name = match repository_full_name.split_once('/') {
            Some(_) => match self.config.owned_short_name(repository_full_name) {
                Some(name) => name,
                None => return ContentSourceMatch::EMPTY,
            },
            None => repository_full_name,
        };

        match self.config.repository(short_name) {
            Some(repository) => {
                let mut result = ContentSourceMatch::EMPTY;
                if branch_or_tag == repository.current_branch {
                    result.current = Some(ContentSource::Current);
                }
                if branch_or_tag == repository.next_branch {
                    result.next = Some(ContentSource::Next);
                }
                if branch_or_tag == repository.edge_branch {
                    result.edge = Some(ContentSource::Edge);
                }

                // A version branch at or above the configured current
                // version builds before configuration catches up. When
                // the current branch is not a parseable version, any
                // version branch qualifies.
                if let Some(version) = VersionBranch::parse(branch_or_tag) {
                    match repository.current_version() {
                        Some(current) if version >= current => result.speculative = true,
                        None => result.speculative = true,
                        Some(_) => {}
                    }
                }

                // Last-resort default-branch rule for known repositories.
                if result.is_empty() && DEFAULT_BRANCHES.contains(&branch_or_tag) {
                    result.speculative = true;
                }

                result
            }
            None => {
                // Unknown first-party repository: build its main line and
                // version branches optimistically.
                let speculative = VersionBranch::parse(branch_or_tag).is_some()
                    || DEFAULT_BRANCHES.contains(&branch_or_tag);
                ContentSourceMatch {
                    speculative,
                    ..ContentSourceMatch::EMPTY
                }
            }
        }
    }
}

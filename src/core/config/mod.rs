//! core::config
//!
//! Configuration loading and the finalized configuration view.
//!
//! # Lifecycle
//!
//! The configuration file is parsed and validated once at process start.
//! The resulting [`PublishConfig`] is immutable: every component borrows
//! it read-only for the lifetime of the run. A misconfiguration is fatal
//! before any network activity happens.
//!
//! # Defaults
//!
//! Loading fills in every optional field: branches default to `main`,
//! origins to `https://github.com/{org}/{name}`, and the narrative
//! repository is inserted into the repository table when the file leaves
//! it out.

pub mod schema;

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

pub use schema::CheckoutStrategy;
use schema::ConfigFile;

use crate::core::types::{ContentSource, RepositoryName, TypeError, VersionBranch};

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "BINDERY_CONFIG";

/// Default documentation subdirectory for sparse checkouts.
const DEFAULT_DOCS_DIR: &str = "docs";

/// Default name of the narrative repository.
const DEFAULT_NARRATIVE_REPOSITORY: &str = "docs-content";

/// Default branch for all three content sources.
const DEFAULT_BRANCH: &str = "main";

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML.
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required field is missing.
    #[error("missing configuration field: {0}")]
    Missing(String),

    /// A field value is invalid.
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<TypeError> for ConfigError {
    fn from(err: TypeError) -> Self {
        ConfigError::InvalidValue(err.to_string())
    }
}

/// A configured content repository, fully defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Unique repository name; key of the configuration table.
    pub name: RepositoryName,
    /// Git origin URL.
    pub origin: String,
    /// Branch published as the stable line.
    pub current_branch: String,
    /// Branch published as the upcoming line.
    pub next_branch: String,
    /// Branch published as the development line.
    pub edge_branch: String,
    /// How the working copy is acquired.
    pub checkout_strategy: CheckoutStrategy,
    /// Whether cloning requires authentication.
    pub private: bool,
    /// Exclude from the publish pass entirely.
    pub skip: bool,
}

impl Repository {
    /// The branch this repository publishes for the given content source.
    pub fn branch_for(&self, source: ContentSource) -> &str {
        match source {
            ContentSource::Current => &self.current_branch,
            ContentSource::Next => &self.next_branch,
            ContentSource::Edge => &self.edge_branch,
        }
    }

    /// The repository's current version, when its stable branch is a
    /// version branch.
    pub fn current_version(&self) -> Option<VersionBranch> {
        VersionBranch::parse(&self.current_branch)
    }
}

/// A deployment environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Environment name (`preview`, `staging`, `production`, ...).
    pub name: String,
    /// URL path prefix; empty means pass-through resolution.
    pub path_prefix: String,
}

impl Environment {
    /// Whether resolved links pass through without an environment prefix.
    pub fn is_passthrough(&self) -> bool {
        self.path_prefix.is_empty()
    }
}

/// Finalized sync settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Maximum fraction of remote files a plan may delete. Default 0.1.
    pub delete_ratio_threshold: f64,
    /// Keys per delete batch request. Default 1000.
    pub delete_batch_size: usize,
    /// Remote key prefix the site is published under.
    pub remote_prefix: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            delete_ratio_threshold: 0.1,
            delete_batch_size: crate::store::MAX_DELETE_BATCH,
            remote_prefix: String::new(),
        }
    }
}

/// The finalized, immutable process configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishConfig {
    /// Organization owning all first-party repositories.
    pub organization: String,
    /// Name of the narrative repository; always present in
    /// [`PublishConfig::repositories`].
    pub narrative_repository: RepositoryName,
    /// Documentation subdirectory inside each repository.
    pub docs_dir: String,
    /// Table-of-contents URL prefixes for link resolution.
    pub toc_prefixes: Vec<String>,
    /// Deployment environments by name.
    pub environments: BTreeMap<String, Environment>,
    /// Sync pipeline settings.
    pub sync: SyncConfig,
    /// Content repositories by name.
    pub repositories: BTreeMap<RepositoryName, Repository>,
}

impl PublishConfig {
    /// Load configuration from the given file.
    ///
    /// `$BINDERY_CONFIG` takes precedence over the passed path when set.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] is fatal; no network activity has happened
    /// yet when loading fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let path = match std::env::var_os(CONFIG_ENV_VAR) {
            Some(overridden) => std::path::PathBuf::from(overridden),
            None => path.to_path_buf(),
        };
        let raw = std::fs::read_to_string(&path)?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(raw)?;
        file.validate()?;
        Self::finalize(file)
    }

    fn finalize(file: ConfigFile) -> Result<Self, ConfigError> {
        let organization = file
            .organization
            .ok_or_else(|| ConfigError::Missing("organization".to_string()))?;

        let narrative_repository = RepositoryName::new(
            file.narrative_repository
                .unwrap_or_else(|| DEFAULT_NARRATIVE_REPOSITORY.to_string()),
        )?;

        let mut repositories = BTreeMap::new();
        for (name, settings) in file.repositories {
            let name = RepositoryName::new(name)?;
            let repository = Self::finalize_repository(&organization, name.clone(), settings);
            repositories.insert(name, repository);
        }

        // The narrative repository participates in every publish pass,
        // configured or not.
        if !repositories.contains_key(&narrative_repository) {
            let repository = Self::finalize_repository(
                &organization,
                narrative_repository.clone(),
                schema::RepositorySettings::default(),
            );
            repositories.insert(narrative_repository.clone(), repository);
        }

        let environments = file
            .environments
            .into_iter()
            .map(|(name, settings)| {
                let environment = Environment {
                    name: name.clone(),
                    path_prefix: settings
                        .path_prefix
                        .unwrap_or_default()
                        .trim_matches('/')
                        .to_string(),
                };
                (name, environment)
            })
            .collect();

        let defaults = SyncConfig::default();
        let sync = SyncConfig {
            delete_ratio_threshold: file
                .sync
                .delete_ratio_threshold
                .unwrap_or(defaults.delete_ratio_threshold),
            delete_batch_size: file
                .sync
                .delete_batch_size
                .unwrap_or(defaults.delete_batch_size),
            remote_prefix: file
                .sync
                .remote_prefix
                .unwrap_or_default()
                .trim_matches('/')
                .to_string(),
        };

        Ok(Self {
            organization,
            narrative_repository,
            docs_dir: file.docs_dir.unwrap_or_else(|| DEFAULT_DOCS_DIR.to_string()),
            toc_prefixes: file.toc_prefixes,
            environments,
            sync,
            repositories,
        })
    }

    fn finalize_repository(
        organization: &str,
        name: RepositoryName,
        settings: schema::RepositorySettings,
    ) -> Repository {
        let origin = settings
            .origin
            .unwrap_or_else(|| format!("https://github.com/{}/{}", organization, name));
        Repository {
            origin,
            current_branch: settings
                .current_branch
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            next_branch: settings
                .next_branch
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            edge_branch: settings
                .edge_branch
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            checkout_strategy: settings.checkout_strategy.unwrap_or_default(),
            private: settings.private.unwrap_or(false),
            skip: settings.skip.unwrap_or(false),
            name,
        }
    }

    /// Look up a configured repository by short name.
    pub fn repository(&self, name: &str) -> Option<&Repository> {
        let name = RepositoryName::new(name).ok()?;
        self.repositories.get(&name)
    }

    /// Split an `org/repo` full name into its short name when the
    /// repository is owned by the configured organization.
    pub fn owned_short_name<'a>(&self, full_name: &'a str) -> Option<&'a str> {
        let (org, name) = full_name.split_once('/')?;
        if org == self.organization && !name.is_empty() {
            Some(name)
        } else {
            None
        }
    }

    /// The `org/repo` full name of a configured repository.
    pub fn full_name(&self, repository: &Repository) -> String {
        format!("{}/{}", self.organization, repository.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(raw: &str) -> PublishConfig {
        PublishConfig::from_toml(raw).expect("valid config")
    }

    #[test]
    fn defaults_are_filled() {
        let config = config(
            r#"
            organization = "acme"
            [repositories.kibana]
            "#,
        );
        let kibana = config.repository("kibana").unwrap();
        assert_eq!(kibana.origin, "https://github.com/acme/kibana");
        assert_eq!(kibana.current_branch, "main");
        assert_eq!(kibana.next_branch, "main");
        assert_eq!(kibana.edge_branch, "main");
        assert_eq!(kibana.checkout_strategy, CheckoutStrategy::Full);
        assert!(!kibana.private);
        assert!(!kibana.skip);
    }

    #[test]
    fn narrative_repository_always_present() {
        let config = config("organization = \"acme\"");
        assert!(config
            .repositories
            .contains_key(&config.narrative_repository));
        assert_eq!(config.narrative_repository.as_str(), "docs-content");
    }

    #[test]
    fn configured_narrative_repository_not_duplicated() {
        let config = config(
            r#"
            organization = "acme"
            narrative_repository = "handbook"
            [repositories.handbook]
            current_branch = "stable"
            "#,
        );
        assert_eq!(config.repositories.len(), 1);
        assert_eq!(
            config.repository("handbook").unwrap().current_branch,
            "stable"
        );
    }

    #[test]
    fn branch_for_selects_configured_branch() {
        let config = config(
            r#"
            organization = "acme"
            [repositories.kibana]
            current_branch = "8.19"
            next_branch = "main"
            edge_branch = "main"
            "#,
        );
        let kibana = config.repository("kibana").unwrap();
        assert_eq!(kibana.branch_for(ContentSource::Current), "8.19");
        assert_eq!(kibana.branch_for(ContentSource::Next), "main");
        assert_eq!(kibana.branch_for(ContentSource::Edge), "main");
    }

    #[test]
    fn current_version_parses_version_branch() {
        let config = config(
            r#"
            organization = "acme"
            [repositories.kibana]
            current_branch = "8.19"
            [repositories.beats]
            "#,
        );
        let version = config.repository("kibana").unwrap().current_version();
        assert_eq!(version, Some(VersionBranch::parse("8.19").unwrap()));
        assert_eq!(config.repository("beats").unwrap().current_version(), None);
    }

    #[test]
    fn owned_short_name_checks_organization() {
        let config = config("organization = \"acme\"");
        assert_eq!(config.owned_short_name("acme/kibana"), Some("kibana"));
        assert_eq!(config.owned_short_name("intruder/kibana"), None);
        assert_eq!(config.owned_short_name("kibana"), None);
        assert_eq!(config.owned_short_name("acme/"), None);
    }

    #[test]
    fn full_name_joins_organization() {
        let config = config(
            r#"
            organization = "acme"
            [repositories.kibana]
            "#,
        );
        let kibana = config.repository("kibana").unwrap();
        assert_eq!(config.full_name(kibana), "acme/kibana");
    }

    #[test]
    fn environment_prefix_is_trimmed() {
        let config = config(
            r#"
            organization = "acme"
            [environments.preview]
            [environments.production]
            path_prefix = "/docs/"
            "#,
        );
        assert!(config.environments["preview"].is_passthrough());
        assert_eq!(config.environments["production"].path_prefix, "docs");
    }

    #[test]
    fn sync_defaults() {
        let config = config("organization = \"acme\"");
        assert_eq!(config.sync.delete_ratio_threshold, 0.1);
        assert_eq!(config.sync.delete_batch_size, 1000);
        assert_eq!(config.sync.remote_prefix, "");
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let result = PublishConfig::from_toml("organization = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}

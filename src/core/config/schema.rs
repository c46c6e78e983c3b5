//! core::config::schema
//!
//! Configuration file schema types.
//!
//! # File Location
//!
//! Located at (in order of precedence):
//! 1. `$BINDERY_CONFIG` if set
//! 2. The path passed to [`PublishConfig::load`]
//!
//! # Validation
//!
//! Schema types mirror the TOML file exactly and are validated after
//! parsing. The finalized, defaulted view lives in the parent module;
//! these raw types never escape configuration loading.
//!
//! [`PublishConfig::load`]: super::PublishConfig::load

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::RepositoryName;

/// How a repository's working copy is acquired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStrategy {
    /// Single-branch, depth-1 clone of the whole tree.
    #[default]
    Full,
    /// Blob-less clone with a cone-mode sparse checkout restricted to
    /// the documentation subdirectory.
    Partial,
}

/// Raw configuration file.
///
/// # Example
///
/// ```toml
/// organization = "acme"
/// narrative_repository = "docs-content"
/// toc_prefixes = ["kibana", "kibana/extend"]
///
/// [environments.preview]
/// [environments.production]
/// path_prefix = "docs"
///
/// [sync]
/// delete_ratio_threshold = 0.1
///
/// [repositories.kibana]
/// current_branch = "8.19"
/// next_branch = "main"
/// checkout_strategy = "partial"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Organization owning all first-party repositories.
    pub organization: Option<String>,

    /// Name of the distinguished narrative repository.
    pub narrative_repository: Option<String>,

    /// Subdirectory holding documentation sources inside each repository.
    pub docs_dir: Option<String>,

    /// Table-of-contents URL prefixes, most specific entries winning by
    /// longest match during link resolution.
    pub toc_prefixes: Vec<String>,

    /// Deployment environments by name.
    pub environments: BTreeMap<String, EnvironmentSettings>,

    /// Sync pipeline settings.
    pub sync: SyncSettings,

    /// Configured content repositories by name.
    pub repositories: BTreeMap<String, RepositorySettings>,
}

impl ConfigFile {
    /// Validate the raw configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid, or
    /// `ConfigError::Missing` when a required field is absent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let organization = self
            .organization
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("organization".to_string()))?;
        if organization.is_empty() {
            return Err(ConfigError::InvalidValue(
                "organization cannot be empty".to_string(),
            ));
        }

        if let Some(narrative) = &self.narrative_repository {
            RepositoryName::new(narrative).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid narrative repository: {}", e))
            })?;
        }

        for name in self.repositories.keys() {
            RepositoryName::new(name).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid repository name: {}", e))
            })?;
        }

        for (name, settings) in &self.repositories {
            settings
                .validate()
                .map_err(|e| ConfigError::InvalidValue(format!("repository {}: {}", name, e)))?;
        }

        self.sync.validate()?;

        Ok(())
    }
}

/// A deployment environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentSettings {
    /// URL path prefix prepended to resolved links in this environment.
    ///
    /// Absent or empty means pass-through resolution (the preview
    /// behavior).
    pub path_prefix: Option<String>,
}

/// Sync pipeline settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
    /// Maximum fraction of remote files a plan may delete.
    pub delete_ratio_threshold: Option<f64>,

    /// Keys per delete batch request.
    pub delete_batch_size: Option<usize>,

    /// Remote key prefix the site is published under.
    pub remote_prefix: Option<String>,
}

impl SyncSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ratio) = self.delete_ratio_threshold {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(ConfigError::InvalidValue(format!(
                    "delete_ratio_threshold must be within [0, 1], got {}",
                    ratio
                )));
            }
        }
        if let Some(size) = self.delete_batch_size {
            if size == 0 || size > crate::store::MAX_DELETE_BATCH {
                return Err(ConfigError::InvalidValue(format!(
                    "delete_batch_size must be within [1, {}], got {}",
                    crate::store::MAX_DELETE_BATCH,
                    size
                )));
            }
        }
        Ok(())
    }
}

/// Raw per-repository settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepositorySettings {
    /// Git origin URL. Defaults to `https://github.com/{org}/{name}`.
    pub origin: Option<String>,

    /// Branch published as the stable line. Defaults to `main`.
    pub current_branch: Option<String>,

    /// Branch published as the upcoming line. Defaults to `main`.
    pub next_branch: Option<String>,

    /// Branch published as the development line. Defaults to `main`.
    pub edge_branch: Option<String>,

    /// Checkout strategy. Defaults to `full`.
    pub checkout_strategy: Option<CheckoutStrategy>,

    /// Whether the repository requires authentication to clone.
    pub private: Option<bool>,

    /// Exclude this repository from the publish pass entirely.
    pub skip: Option<bool>,
}

impl RepositorySettings {
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("current_branch", &self.current_branch),
            ("next_branch", &self.next_branch),
            ("edge_branch", &self.edge_branch),
        ] {
            if let Some(branch) = value {
                if branch.is_empty() {
                    return Err(ConfigError::InvalidValue(format!(
                        "{} cannot be empty",
                        field
                    )));
                }
            }
        }
        if let Some(origin) = &self.origin {
            if origin.is_empty() {
                return Err(ConfigError::InvalidValue("origin cannot be empty".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_parses() {
        let file: ConfigFile = toml::from_str("organization = \"acme\"").unwrap();
        assert_eq!(file.organization.as_deref(), Some("acme"));
        assert!(file.repositories.is_empty());
        file.validate().unwrap();
    }

    #[test]
    fn full_file_parses() {
        let file: ConfigFile = toml::from_str(
            r#"
            organization = "acme"
            narrative_repository = "docs-content"
            docs_dir = "docs"
            toc_prefixes = ["kibana", "kibana/extend"]

            [environments.preview]
            [environments.production]
            path_prefix = "docs"

            [sync]
            delete_ratio_threshold = 0.2
            delete_batch_size = 500
            remote_prefix = "site"

            [repositories.kibana]
            current_branch = "8.19"
            next_branch = "main"
            checkout_strategy = "partial"
            private = true
            "#,
        )
        .unwrap();

        file.validate().unwrap();
        let kibana = &file.repositories["kibana"];
        assert_eq!(kibana.checkout_strategy, Some(CheckoutStrategy::Partial));
        assert_eq!(kibana.private, Some(true));
        assert_eq!(file.environments.len(), 2);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<ConfigFile, _> =
            toml::from_str("organization = \"acme\"\nunknown_field = 1");
        assert!(result.is_err());
    }

    #[test]
    fn missing_organization_fails_validation() {
        let file: ConfigFile = toml::from_str("").unwrap();
        assert!(matches!(file.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn delete_ratio_out_of_range_rejected() {
        let file: ConfigFile = toml::from_str(
            "organization = \"acme\"\n[sync]\ndelete_ratio_threshold = 1.5",
        )
        .unwrap();
        assert!(matches!(
            file.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn oversized_delete_batch_rejected() {
        let file: ConfigFile =
            toml::from_str("organization = \"acme\"\n[sync]\ndelete_batch_size = 5000").unwrap();
        assert!(file.validate().is_err());
    }

    #[test]
    fn invalid_repository_name_rejected() {
        let file: ConfigFile =
            toml::from_str("organization = \"acme\"\n[repositories.\"bad name\"]").unwrap();
        assert!(file.validate().is_err());
    }

    #[test]
    fn empty_branch_rejected() {
        let file: ConfigFile = toml::from_str(
            "organization = \"acme\"\n[repositories.kibana]\ncurrent_branch = \"\"",
        )
        .unwrap();
        assert!(file.validate().is_err());
    }
}

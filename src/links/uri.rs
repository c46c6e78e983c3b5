//! links::uri
//!
//! Cross-link URI parsing.
//!
//! # Design
//!
//! A cross-link addresses another repository's page through a virtual
//! `repository://path#anchor` scheme. The scheme names the target
//! repository; it is never a transport. Parsing happens once at the
//! boundary into a typed value; nothing deeper in the pipeline matches
//! on raw strings.
//!
//! Standard web schemes are explicitly excluded from this mechanism.
//! A document author writing `https://...` gets an ordinary link, not a
//! cross-link, and a stray `mailto:` can never be mistaken for a
//! repository reference.
//!
//! # Example
//!
//! ```
//! use bindery::links::uri::CrossLinkUri;
//!
//! let uri = CrossLinkUri::parse("kibana://troubleshooting/logs.md#common-errors").unwrap();
//! assert_eq!(uri.repository, "kibana");
//! assert_eq!(uri.path, "troubleshooting/logs.md");
//! assert_eq!(uri.fragment.as_deref(), Some("common-errors"));
//!
//! assert!(CrossLinkUri::parse("https://example.com/page").is_err());
//! ```

use thiserror::Error;

/// Schemes that are ordinary links, never cross-links.
pub const EXCLUDED_SCHEMES: [&str; 7] = ["http", "https", "ftp", "file", "tel", "jdbc", "mailto"];

/// Errors from cross-link URI parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UriError {
    /// The value has no `scheme://` part.
    #[error("not a cross-link uri: {0}")]
    NoScheme(String),

    /// The scheme is a standard web scheme, not a repository.
    #[error("scheme '{0}' is a standard web scheme, not a repository")]
    ExcludedScheme(String),

    /// The scheme part is empty.
    #[error("cross-link uri has an empty repository: {0}")]
    EmptyRepository(String),
}

/// A parsed cross-link: target repository, page path, optional anchor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrossLinkUri {
    /// Target repository named by the scheme.
    pub repository: String,
    /// Page path within the target repository's documentation.
    pub path: String,
    /// Optional anchor within the page.
    pub fragment: Option<String>,
}

impl CrossLinkUri {
    /// Parse a cross-link URI of the shape `repository://path[#anchor]`.
    ///
    /// # Errors
    ///
    /// - [`UriError::NoScheme`] when there is no `://` separator
    /// - [`UriError::ExcludedScheme`] for standard web schemes
    /// - [`UriError::EmptyRepository`] when the scheme part is empty
    pub fn parse(raw: &str) -> Result<Self, UriError> {
        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| UriError::NoScheme(raw.to_string()))?;

        if scheme.is_empty() {
            return Err(UriError::EmptyRepository(raw.to_string()));
        }
        if EXCLUDED_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
            return Err(UriError::ExcludedScheme(scheme.to_string()));
        }

        let (path, fragment) = match rest.split_once('#') {
            Some((path, fragment)) if !fragment.is_empty() => {
                (path, Some(fragment.to_string()))
            }
            Some((path, _)) => (path, None),
            None => (rest, None),
        };

        Ok(Self {
            repository: scheme.to_string(),
            path: path.trim_matches('/').to_string(),
            fragment,
        })
    }

    /// Whether a raw value looks like a cross-link at all.
    ///
    /// Useful for callers scanning documents: `true` means
    /// [`CrossLinkUri::parse`] will not return [`UriError::NoScheme`]
    /// or [`UriError::ExcludedScheme`].
    pub fn is_cross_link(raw: &str) -> bool {
        match raw.split_once("://") {
            Some((scheme, _)) => {
                !scheme.is_empty()
                    && !EXCLUDED_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str())
            }
            None => false,
        }
    }
}

impl std::fmt::Display for CrossLinkUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.repository, self.path)?;
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repository_and_path() {
        let uri = CrossLinkUri::parse("kibana://guide/setup.md").unwrap();
        assert_eq!(uri.repository, "kibana");
        assert_eq!(uri.path, "guide/setup.md");
        assert_eq!(uri.fragment, None);
    }

    #[test]
    fn parses_fragment() {
        let uri = CrossLinkUri::parse("kibana://guide/setup.md#install").unwrap();
        assert_eq!(uri.fragment.as_deref(), Some("install"));
    }

    #[test]
    fn empty_fragment_is_none() {
        let uri = CrossLinkUri::parse("kibana://guide/setup.md#").unwrap();
        assert_eq!(uri.fragment, None);
    }

    #[test]
    fn trims_path_slashes() {
        let uri = CrossLinkUri::parse("kibana:///guide/").unwrap();
        assert_eq!(uri.path, "guide");
    }

    #[test]
    fn empty_path_is_allowed() {
        // Links to a repository's landing page carry no path
        let uri = CrossLinkUri::parse("kibana://").unwrap();
        assert_eq!(uri.path, "");
    }

    #[test]
    fn rejects_web_schemes() {
        for raw in [
            "http://example.com",
            "https://example.com/a",
            "ftp://host/file",
            "file:///etc/passwd",
            "tel://123",
            "jdbc://db",
            "mailto://someone",
            "HTTPS://example.com",
        ] {
            assert!(
                matches!(CrossLinkUri::parse(raw), Err(UriError::ExcludedScheme(_))),
                "{}",
                raw
            );
        }
    }

    #[test]
    fn rejects_plain_strings() {
        assert!(matches!(
            CrossLinkUri::parse("guide/setup.md"),
            Err(UriError::NoScheme(_))
        ));
    }

    #[test]
    fn rejects_empty_scheme() {
        assert!(matches!(
            CrossLinkUri::parse("://path"),
            Err(UriError::EmptyRepository(_))
        ));
    }

    #[test]
    fn is_cross_link_screening() {
        assert!(CrossLinkUri::is_cross_link("kibana://a/b.md"));
        assert!(!CrossLinkUri::is_cross_link("https://example.com"));
        assert!(!CrossLinkUri::is_cross_link("a/b.md"));
        assert!(!CrossLinkUri::is_cross_link("://a"));
    }

    #[test]
    fn display_roundtrip() {
        for raw in ["kibana://a/b.md", "kibana://a/b.md#anchor"] {
            let uri = CrossLinkUri::parse(raw).unwrap();
            assert_eq!(uri.to_string(), raw);
        }
    }
}

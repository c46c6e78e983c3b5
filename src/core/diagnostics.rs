//! core::diagnostics
//!
//! Shared diagnostics collector.
//!
//! # Design
//!
//! Recoverable conditions are never thrown past component boundaries.
//! Instead, every component reports errors and warnings into a shared
//! [`DiagnosticsCollector`]: a broken cross-link becomes a build error
//! enumerated with its source location, a failed repository checkout is
//! recorded and its siblings continue. The embedding process renders the
//! aggregated report at the end and derives its exit code from
//! [`DiagnosticsCollector::is_fatal`].
//!
//! The collector is cheaply cloneable; clones share the same underlying
//! sink and may be handed to concurrent tasks.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Fatal for the publish pass as a whole.
    Error,
    /// Surfaced in the report but does not fail the build.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single collected diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The file or repository the diagnostic concerns.
    pub scope: String,
    /// Human-readable message.
    pub message: String,
    /// Severity class.
    pub severity: Severity,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.scope, self.message)
    }
}

/// Thread-safe diagnostics sink shared by all components.
///
/// # Example
///
/// ```
/// use bindery::core::diagnostics::DiagnosticsCollector;
///
/// let diagnostics = DiagnosticsCollector::new();
/// diagnostics.warning("kibana", "manifest is three weeks old");
/// diagnostics.error("kibana://missing/page.md", "page not found");
///
/// assert!(diagnostics.is_fatal());
/// assert_eq!(diagnostics.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsCollector {
    inner: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticsCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error-severity diagnostic.
    pub fn error(&self, scope: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic {
            scope: scope.into(),
            message: message.into(),
            severity: Severity::Error,
        });
    }

    /// Record a warning-severity diagnostic.
    pub fn warning(&self, scope: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic {
            scope: scope.into(),
            message: message.into(),
            severity: Severity::Warning,
        });
    }

    /// Record a pre-built diagnostic.
    pub fn push(&self, diagnostic: Diagnostic) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.push(diagnostic);
    }

    /// Whether any error-severity diagnostic was collected.
    ///
    /// The embedding process exits non-zero when this is true.
    pub fn is_fatal(&self) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.iter().any(|d| d.severity == Severity::Error)
    }

    /// Number of collected diagnostics.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.len()
    }

    /// Whether no diagnostics have been collected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all collected diagnostics, errors first.
    pub fn collected(&self) -> Vec<Diagnostic> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut all = inner.clone();
        all.sort_by_key(|d| d.severity);
        all
    }

    /// Render the aggregated report.
    ///
    /// Errors are listed before warnings, followed by a one-line summary.
    pub fn report(&self) -> String {
        let all = self.collected();
        let errors = all.iter().filter(|d| d.severity == Severity::Error).count();
        let warnings = all.len() - errors;

        let mut lines: Vec<String> = all.iter().map(|d| d.to_string()).collect();
        lines.push(format!("{} error(s), {} warning(s)", errors, warnings));
        lines.join("\n")
    }
}

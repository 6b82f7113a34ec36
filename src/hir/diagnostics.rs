//! Diagnostics: modeling errors and warnings.
//!
//! The engine never aborts on a modeling problem: it records a
//! [`Diagnostic`] and continues with the next reference. Diagnostics carry a
//! stable message id from the [catalog](super::messages) and the structured
//! parameters they were rendered from.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::ids::ArtifactId;
use super::messages::MessageParams;
use crate::base::Location;

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "lowercase"))]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// A diagnostic message with location.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagnostic {
    pub severity: Severity,
    /// Stable message id, e.g. `ref-undefined-def`.
    pub id: &'static str,
    /// The rendered message text.
    pub message: Arc<str>,
    pub location: Location,
    /// The artifact the message is about, e.g. `my.E:assoc`.
    pub semantic_location: Option<SmolStr>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub params: MessageParams,
    /// Candidate names, only filled when suggestions are requested.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub valid_names: Option<IndexMap<SmolStr, ArtifactId>>,
    /// Optional related information.
    pub related: Vec<RelatedInfo>,
}

/// Related information for a diagnostic.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RelatedInfo {
    pub location: Location,
    pub message: Arc<str>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        id: &'static str,
        location: Location,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            severity,
            id,
            message: message.into(),
            location,
            semantic_location: None,
            params: MessageParams::default(),
            valid_names: None,
            related: Vec::new(),
        }
    }

    /// Create a new error diagnostic.
    pub fn error(id: &'static str, location: Location, message: impl Into<Arc<str>>) -> Self {
        Self::new(Severity::Error, id, location, message)
    }

    /// Create a new warning diagnostic.
    pub fn warning(id: &'static str, location: Location, message: impl Into<Arc<str>>) -> Self {
        Self::new(Severity::Warning, id, location, message)
    }

    pub fn with_semantic_location(mut self, name: impl Into<SmolStr>) -> Self {
        self.semantic_location = Some(name.into());
        self
    }

    pub fn with_params(mut self, params: MessageParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_valid_names(mut self, names: IndexMap<SmolStr, ArtifactId>) -> Self {
        self.valid_names = Some(names);
        self
    }

    /// Add related information.
    pub fn with_related(mut self, info: RelatedInfo) -> Self {
        self.related.push(info);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}: {} [{}]",
            self.location,
            self.severity.as_str(),
            self.message,
            self.id
        )
    }
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Append-only diagnostic list.
///
/// A second diagnostic with the same id at the same location is dropped, so
/// a broken reference visited from several paths is reported once.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    flagged: FxHashSet<(Location, &'static str)>,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic; returns `false` if it was already reported.
    pub fn add(&mut self, diagnostic: Diagnostic) -> bool {
        if !self.flagged.insert((diagnostic.location, diagnostic.id)) {
            return false;
        }
        self.diagnostics.push(diagnostic);
        true
    }

    /// True if a diagnostic with `id` was reported at `location`.
    pub fn is_flagged(&self, location: Location, id: &'static str) -> bool {
        self.flagged.contains(&(location, id))
    }

    /// Get all diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Get the number of errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Get the number of warnings.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Sort by location, then id.
    pub fn sort(&mut self) {
        self.diagnostics
            .sort_by(|a, b| a.location.cmp(&b.location).then_with(|| a.id.cmp(b.id)));
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        self.flagged.clear();
        std::mem::take(&mut self.diagnostics)
    }
}

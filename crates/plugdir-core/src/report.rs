//! Per-spec resolution report and diagnostics.
//!
//! Nothing here is fatal. A run always produces a complete report; the
//! diagnostics explain every spec that was degraded along the way.

use std::fmt;

use serde::Serialize;

use crate::types::Provenance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    UnresolvedSpec,
    FetchError,
    AmbiguousLinkName,
    MalformedIdentifier,
    VersionMismatchFallback,
    UnverifiedFetch,
    DegenerateName,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::UnresolvedSpec => "unresolved-spec",
            DiagnosticKind::FetchError => "fetch-error",
            DiagnosticKind::AmbiguousLinkName => "ambiguous-link-name",
            DiagnosticKind::MalformedIdentifier => "malformed-identifier",
            DiagnosticKind::VersionMismatchFallback => "version-mismatch-fallback",
            DiagnosticKind::UnverifiedFetch => "unverified-fetch",
            DiagnosticKind::DegenerateName => "degenerate-name",
        }
    }

    /// Kinds that leave the spec out of the layout are errors.
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::UnresolvedSpec
            | DiagnosticKind::FetchError
            | DiagnosticKind::DegenerateName => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Position of the spec in the catalog
    pub position: usize,
    pub spec_id: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        position: usize,
        spec_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            position,
            spec_id: spec_id.into(),
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.spec_id, self.message)
    }
}

/// One line of the audit trail, for every input spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecReport {
    pub id: String,
    pub link_name: String,
    pub provenance: Provenance,
    pub concrete_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub registry: usize,
    pub fetched: usize,
    pub unresolved: usize,
    pub diagnostics: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    /// In catalog order
    pub specs: Vec<SpecReport>,
    /// Sorted by catalog position, then in the order they were raised
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolutionReport {
    pub fn summary(&self) -> ReportSummary {
        let count = |p: Provenance| self.specs.iter().filter(|s| s.provenance == p).count();
        ReportSummary {
            total: self.specs.len(),
            registry: count(Provenance::Registry),
            fetched: count(Provenance::Fetched),
            unresolved: count(Provenance::Unresolved),
            diagnostics: self.diagnostics.len(),
        }
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity() == Severity::Error)
    }
}

/// Join the messages of every diagnostic raised at `position`.
pub(crate) fn warning_for(diagnostics: &[Diagnostic], position: usize) -> Option<String> {
    let messages: Vec<&str> = diagnostics
        .iter()
        .filter(|d| d.position == position)
        .map(|d| d.message.as_str())
        .collect();
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

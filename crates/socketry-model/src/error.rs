//! Build diagnostics.
//!
//! Structural problems found while resolving a module never abort the
//! build. They are recorded as [`Diagnostic`] values attached to the most
//! specific entity (module, bean or socket) and handed to a
//! [`DiagnosticSink`].
//!
//! # Design
//!
//! - `Diagnostic`: single finding with a location, message, labels and notes
//! - `DiagnosticKind`: categorizes findings by the check that produced them
//! - `Severity`: error, warning, or note
//! - `DiagnosticFormatter`: renders diagnostics as text
//!
//! # Examples
//!
//! ```
//! # use socketry_model::error::*;
//! # use socketry_model::foundation::QualifiedName;
//! let socket = QualifiedName::parse("app:service:repo").unwrap();
//! let diagnostic = Diagnostic::new(
//!     DiagnosticKind::UnresolvedSocket,
//!     socket,
//!     "no bean can be wired into required socket".to_string(),
//! );
//! assert!(diagnostic.is_error());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::QualifiedName;

/// A build diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Entity the diagnostic is attached to
    pub location: QualifiedName,
    pub message: String,
    /// Related entities (e.g. the other side of a name conflict)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    /// Additional notes or hints
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Category of a build diagnostic.
///
/// # Invariant
///
/// The discriminant values must match the DIAGNOSTIC_KIND_NAMES array indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DiagnosticKind {
    // Declarations
    /// A wire names something that is not a valid name
    InvalidName = 0,
    /// Two locally visible entities share a simple name
    NameConflict = 1,

    // Wires
    /// A wire names a bean that is not visible
    UnknownBean = 2,
    /// A wire names a bean that matches several visible beans
    AmbiguousBean = 3,
    /// A wired bean is not type-compatible with the socket
    IncompatibleBean = 4,
    /// A wire targets a socket that does not exist
    UnknownSocket = 5,
    /// A wire is malformed (empty, or several beans into a single socket)
    InvalidWire = 6,
    /// Several wires target the same socket
    ConflictingWires = 7,
    /// A wire names the same bean twice
    DuplicateWiredBean = 8,

    // Autowiring
    /// No candidate for a required single socket
    UnresolvedSocket = 9,
    /// Several candidates for a single socket
    MultipleCandidates = 10,
    /// A socket was left without a bean
    UnwiredSocket = 11,

    // Graph validation
    /// Eager construction cycle
    CyclicDependency = 12,

    // Scheduling
    /// A component module failed to build
    FaultyComponent = 13,
}

/// Human-readable names for diagnostic kinds.
///
/// Index matches DiagnosticKind discriminant.
const DIAGNOSTIC_KIND_NAMES: &[&str] = &[
    "invalid name",           // 0: InvalidName
    "name conflict",          // 1: NameConflict
    "unknown bean",           // 2: UnknownBean
    "ambiguous bean",         // 3: AmbiguousBean
    "incompatible bean",      // 4: IncompatibleBean
    "unknown socket",         // 5: UnknownSocket
    "invalid wire",           // 6: InvalidWire
    "conflicting wires",      // 7: ConflictingWires
    "duplicate wired bean",   // 8: DuplicateWiredBean
    "unresolved socket",      // 9: UnresolvedSocket
    "multiple candidates",    // 10: MultipleCandidates
    "unwired socket",         // 11: UnwiredSocket
    "cyclic dependency",      // 12: CyclicDependency
    "faulty component",       // 13: FaultyComponent
];

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational note
    Note,
    /// Build succeeds but something looks wrong
    Warning,
    /// The entity (and its module) is faulty
    Error,
}

/// Secondary location in a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub location: QualifiedName,
    pub message: String,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    pub fn new(kind: DiagnosticKind, location: QualifiedName, message: String) -> Self {
        Self::with_severity(kind, Severity::Error, location, message)
    }

    /// Creates a new warning diagnostic.
    pub fn warning(kind: DiagnosticKind, location: QualifiedName, message: String) -> Self {
        Self::with_severity(kind, Severity::Warning, location, message)
    }

    /// Creates a new note diagnostic.
    pub fn note(kind: DiagnosticKind, location: QualifiedName, message: String) -> Self {
        Self::with_severity(kind, Severity::Note, location, message)
    }

    fn with_severity(
        kind: DiagnosticKind,
        severity: Severity,
        location: QualifiedName,
        message: String,
    ) -> Self {
        Self {
            kind,
            severity,
            location,
            message,
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Adds a related location (for chaining).
    pub fn with_label(mut self, location: QualifiedName, message: String) -> Self {
        self.labels.push(Label { location, message });
        self
    }

    /// Adds a note or hint (for chaining).
    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl DiagnosticKind {
    /// Returns a human-readable name for this diagnostic kind.
    pub fn name(self) -> &'static str {
        DIAGNOSTIC_KIND_NAMES[self as usize]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {}: {}",
            self.severity,
            self.kind.name(),
            self.location,
            self.message
        )
    }
}

/// Receives diagnostics as they are produced.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);

    fn report_all(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>)
    where
        Self: Sized,
    {
        for diagnostic in diagnostics {
            self.report(diagnostic);
        }
    }
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Whether any diagnostic has error severity.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Formats diagnostics as multi-line text.
///
/// ```text
/// error: unresolved socket: no bean can be wired into required socket
///   --> app:service:repo
///    = note: candidate
///      at app:repoA
///    = help: add an explicit wire
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticFormatter {
    min_severity: Option<Severity>,
}

impl DiagnosticFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip diagnostics below `severity` in [`Self::format_all`].
    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    /// Formats a diagnostic with its location, labels and notes.
    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}: {}: {}\n",
            diagnostic.severity,
            diagnostic.kind.name(),
            diagnostic.message
        ));
        output.push_str(&format!("  --> {}\n", diagnostic.location));

        for label in &diagnostic.labels {
            output.push_str(&format!("   = note: {}\n", label.message));
            output.push_str(&format!("     at {}\n", label.location));
        }

        for note in &diagnostic.notes {
            output.push_str(&format!("   = help: {}\n", note));
        }

        output
    }

    /// Formats multiple diagnostics separated by blank lines.
    pub fn format_all(&self, diagnostics: &[Diagnostic]) -> String {
        diagnostics
            .iter()
            .filter(|d| self.min_severity.map_or(true, |min| d.severity >= min))
            .map(|d| self.format(d))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

//! Diagnostics for import and lookup failures.
//!
//! Turns [`LookupResult`]s and [`ImportError`]s into located, coded
//! diagnostics. Wording is informative only; the code and the related
//! locations are the stable part.

use std::fmt;
use std::sync::Arc;

use crate::base::{FileId, FileRange, LineCol, LineIndex};

use super::error::ImportError;
use super::ids::DeclId;
use super::ambiguity::distinct_decls;
use super::resolve::{LookupResult, Origin, Verdict};
use super::table::SymbolTable;

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn display(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// A diagnostic message with location.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub file: FileId,
    pub range: FileRange,
    pub severity: Severity,
    /// Error/warning code (e.g., "E0001").
    pub code: Option<Arc<str>>,
    pub message: Arc<str>,
    pub related: Vec<RelatedInfo>,
}

/// Related information for a diagnostic.
#[derive(Clone, Debug)]
pub struct RelatedInfo {
    /// `None` when the related declaration has no recorded span.
    pub location: Option<FileRange>,
    pub message: Arc<str>,
}

impl Diagnostic {
    pub fn error(range: FileRange, message: impl Into<Arc<str>>) -> Self {
        Self::new(range, Severity::Error, message)
    }

    pub fn warning(range: FileRange, message: impl Into<Arc<str>>) -> Self {
        Self::new(range, Severity::Warning, message)
    }

    fn new(range: FileRange, severity: Severity, message: impl Into<Arc<str>>) -> Self {
        Self {
            file: range.file,
            range,
            severity,
            code: None,
            message: message.into(),
            related: Vec::new(),
        }
    }

    /// Set the error code.
    pub fn with_code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Add related information.
    pub fn with_related(mut self, info: RelatedInfo) -> Self {
        self.related.push(info);
        self
    }

    /// Start and end of the range as 0-indexed line/column pairs.
    pub fn line_cols(&self, index: &LineIndex) -> (LineCol, LineCol) {
        (
            index.line_col(self.range.range.start()),
            index.line_col(self.range.range.end()),
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}[{}]: {}", self.severity.display(), code, self.message),
            None => write!(f, "{}: {}", self.severity.display(), self.message),
        }
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Diagnostic codes for lookup and import failures.
pub mod codes {
    /// Name not found.
    pub const UNDEFINED_REFERENCE: &str = "E0001";
    /// Distinct declarations visible under one name.
    pub const AMBIGUOUS_REFERENCE: &str = "E0002";
    /// Import operand is not a namespace, class, or enum.
    pub const UNRESOLVED_SCOPE: &str = "E0003";
    /// Template instantiation failed while building an import.
    pub const INSTANTIATION_FAILED: &str = "E0004";

    /// A switch fallback candidate lost to an ordinary declaration.
    pub const HIDDEN_ENUMERATOR: &str = "W0001";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics during semantic analysis.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Get diagnostics for a specific file.
    pub fn diagnostics_for_file(&self, file: FileId) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.file == file).collect()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning).count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

// ============================================================================
// LOOKUP REPORTER
// ============================================================================

/// Reports lookup and import outcomes against a symbol table.
pub struct LookupReporter<'a, T: SymbolTable> {
    table: &'a T,
    collector: DiagnosticCollector,
}

impl<'a, T: SymbolTable> LookupReporter<'a, T> {
    pub fn new(table: &'a T) -> Self {
        Self {
            table,
            collector: DiagnosticCollector::new(),
        }
    }

    /// Report the outcome of a lookup made for the reference at `at`.
    ///
    /// Unique and deferred lookups report nothing, except that a unique
    /// result that hid fallback candidates gets a warning.
    pub fn report(&mut self, at: FileRange, result: &LookupResult) {
        let name = self.table.interner().display(result.name);

        match &result.verdict {
            Verdict::Unique(_) if !result.hidden.is_empty() => {
                let mut diag = Diagnostic::warning(
                    at,
                    format!("'{}' refers to a local declaration, not the enumerator", name),
                )
                .with_code(codes::HIDDEN_ENUMERATOR);
                for candidate in &result.hidden {
                    diag = diag.with_related(self.related(candidate.decl, "hidden candidate"));
                }
                self.collector.add(diag);
            }
            Verdict::Unique(_) | Verdict::Deferred => {}
            Verdict::Ambiguous(origins) => {
                let decls = distinct_decls(&result.candidates);
                let names: Vec<String> = decls.iter().map(|&decl| self.decl_name(decl)).collect();
                let mut diag = Diagnostic::error(
                    at,
                    format!(
                        "ambiguous reference: '{}' could be: {}",
                        name,
                        names.join(", ")
                    ),
                )
                .with_code(codes::AMBIGUOUS_REFERENCE);
                for decl in decls {
                    diag = diag.with_related(self.related(decl, "candidate"));
                }
                for origin in origins {
                    diag = diag.with_related(RelatedInfo {
                        location: None,
                        message: Arc::from(format!("visible via {}", self.origin(origin))),
                    });
                }
                self.collector.add(diag);
            }
            Verdict::NotFound => {
                self.collector.add(
                    Diagnostic::error(at, format!("undefined reference: '{}'", name))
                        .with_code(codes::UNDEFINED_REFERENCE),
                );
            }
        }

        for (_, err) in &result.unresolved {
            self.report_import_error(at, err);
        }
    }

    /// Report a rejected import statement.
    pub fn report_import_error(&mut self, at: FileRange, err: &ImportError) {
        let code = match err {
            ImportError::Instantiate(_) => codes::INSTANTIATION_FAILED,
            ImportError::UnresolvedScope { .. } | ImportError::UninstantiatedTemplate { .. } => {
                codes::UNRESOLVED_SCOPE
            }
        };
        self.collector
            .add(Diagnostic::error(at, err.to_string()).with_code(code));
    }

    pub fn collector(&self) -> &DiagnosticCollector {
        &self.collector
    }

    /// Get the collected diagnostics.
    pub fn finish(self) -> Vec<Diagnostic> {
        self.collector.diagnostics
    }

    fn decl_name(&self, decl: DeclId) -> String {
        let Some(d) = self.table.declaration(decl) else {
            return format!("{:?}", decl);
        };
        let owner = self.table.render_owner(d.owner);
        let name = self.table.interner().display(d.name);
        if owner == "::" {
            format!("::{}", name)
        } else {
            format!("{}::{}", owner, name)
        }
    }

    fn related(&self, decl: DeclId, what: &str) -> RelatedInfo {
        RelatedInfo {
            location: self.table.declaration(decl).and_then(|d| d.span),
            message: Arc::from(format!("{}: {}", what, self.decl_name(decl))),
        }
    }

    fn origin(&self, origin: &Origin) -> String {
        match origin {
            Origin::Ordinary(owner) => {
                format!("ordinary lookup in {}", self.table.render_owner(*owner))
            }
            Origin::Imported { scope, .. } => {
                format!("import of {}", self.table.qualified_name(*scope))
            }
            Origin::Associated(scope) => {
                format!("associated scope {}", self.table.qualified_name(*scope))
            }
        }
    }
}

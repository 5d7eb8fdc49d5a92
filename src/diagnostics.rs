//! Diagnostic collection shared by every compiler stage.
//!
//! Per the error handling design, the compiler never aborts the process on a
//! recoverable error: each stage pushes a [`Diagnostic`] onto a shared
//! [`Diagnostics`] list and keeps going so a single file can yield multiple
//! reports in one pass.

use crate::position::SourcePosition;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
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

/// The four error categories named in the error handling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticCategory {
    Lexical,
    Syntactic,
    Semantic,
    Io,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Lexical => write!(f, "lexical"),
            DiagnosticCategory::Syntactic => write!(f, "syntactic"),
            DiagnosticCategory::Semantic => write!(f, "semantic"),
            DiagnosticCategory::Io => write!(f, "io"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: DiagnosticCategory,
    pub position: SourcePosition,
    pub message: String,
}

impl Diagnostic {
    pub fn error(category: DiagnosticCategory, position: SourcePosition, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            position,
            message: message.into(),
        }
    }

    pub fn warning(category: DiagnosticCategory, position: SourcePosition, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category,
            position,
            message: message.into(),
        }
    }

    /// Render as `filename:line:column: kind: message`.
    pub fn display_for(&self, filename: &str) -> String {
        format!(
            "{}:{}: {}: {}",
            filename, self.position, self.category, self.message
        )
    }
}

/// Accumulates diagnostics across an entire compile. Cheap to clone; owned by
/// a single compilation, never shared across threads.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn error(&mut self, category: DiagnosticCategory, position: SourcePosition, message: impl Into<String>) {
        self.push(Diagnostic::error(category, position, message));
    }

    pub fn warning(&mut self, category: DiagnosticCategory, position: SourcePosition, message: impl Into<String>) {
        self.push(Diagnostic::warning(category, position, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_filename_line_column_kind_message() {
        let diag = Diagnostic::error(
            DiagnosticCategory::Syntactic,
            SourcePosition {
                offset: 10,
                line: 3,
                column: 5,
            },
            "expected '{'",
        );
        assert_eq!(diag.display_for("main.chtl"), "main.chtl:3:5: syntactic: expected '{'");
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let mut diags = Diagnostics::new();
        diags.warning(DiagnosticCategory::Semantic, SourcePosition::start(), "shadowed id");
        assert!(!diags.has_errors());
        diags.error(DiagnosticCategory::Semantic, SourcePosition::start(), "boom");
        assert!(diags.has_errors());
    }
}

//! Structured diagnostics for the front-end, validator and code generator
//!
//! Every failure carries a kind, a human-readable message and the location of
//! the offending grammar element. Lowering is fail-fast: the first diagnostic
//! aborts the enclosing protocol and nothing generated for it is kept.

use super::ast::range::Range;
use serde::Serialize;
use std::fmt;

/// The distinct rule violations the engine reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// Lexing, layout or token-level parse failure
    SyntaxError,
    /// An item matches none of the accepted declaration shapes
    MalformedDeclaration,
    MissingSelfParameter,
    UnknownOverrideTarget,
    /// An impl appears before any method signature
    EmptyMethodSet,
    /// A block keyword that is not valid where it appears
    InvalidCommand,
    DuplicateFieldName,
    /// A constructor-shaped routine whose return type is not the impl
    ConstructorTypeMismatch,
    DuplicateConstructor,
    /// Two methods of one protocol mangle to the same slot
    ManglingCollision,
    /// Override parameters or return type disagree with the signature
    SignatureMismatch,
    /// Two emitted declarations (or protocols) share a name
    DuplicateSymbol,
    /// Strict coverage: an impl leaves a method without an override
    IncompleteCoverage,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::SyntaxError => "syntax-error",
            DiagnosticKind::MalformedDeclaration => "malformed-declaration",
            DiagnosticKind::MissingSelfParameter => "missing-self-parameter",
            DiagnosticKind::UnknownOverrideTarget => "unknown-override-target",
            DiagnosticKind::EmptyMethodSet => "empty-method-set",
            DiagnosticKind::InvalidCommand => "invalid-command",
            DiagnosticKind::DuplicateFieldName => "duplicate-field-name",
            DiagnosticKind::ConstructorTypeMismatch => "constructor-type-mismatch",
            DiagnosticKind::DuplicateConstructor => "duplicate-constructor",
            DiagnosticKind::ManglingCollision => "mangling-collision",
            DiagnosticKind::SignatureMismatch => "signature-mismatch",
            DiagnosticKind::DuplicateSymbol => "duplicate-symbol",
            DiagnosticKind::IncompleteCoverage => "incomplete-coverage",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub range: Range,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, range: Range) -> Self {
        Self {
            kind,
            message: message.into(),
            range,
        }
    }

    /// Message plus the surrounding source lines, for terminal output
    pub fn render(&self, source: &str) -> String {
        let mut out = format!("{}\n", self);
        out.push_str(&format_source_context(source, &self.range));
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // positions are 0-based internally
        write!(
            f,
            "error[{}] at {}:{}: {}",
            self.kind,
            self.range.start.line + 1,
            self.range.start.column + 1,
            self.message
        )
    }
}

impl std::error::Error for Diagnostic {}

/// Format source code context around an error location
///
/// Shows 2 lines before the error, the error line with >> marker, and 2 lines after.
pub fn format_source_context(source: &str, range: &Range) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let error_line = range.start.line;

    let start_line = error_line.saturating_sub(2);
    let end_line = (error_line + 3).min(lines.len());

    let mut context = String::new();

    for (line_num, line) in lines.iter().enumerate().take(end_line).skip(start_line) {
        let marker = if line_num == error_line { ">>" } else { "  " };
        context.push_str(&format!("{} {:3} | {}\n", marker, line_num + 1, line));
    }

    context
}

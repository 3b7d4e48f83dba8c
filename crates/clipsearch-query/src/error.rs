//! Diagnostics for query parsing and normalization.
//!
//! Nothing in the pipeline is fatal: malformed constructs degrade to literal
//! terms, and each degradation is reported as a [`Diagnostic`]. The strict
//! entry point converts the first diagnostic into a hard [`QueryError`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::lexer::Position;

/// Stable identifier for a diagnostic condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    /// A field name followed by `:` with no usable value.
    DanglingColon,
    /// A comparison operator after `:` with no value following it.
    IncompleteComparison,
    /// A `..` after a number with no upper bound following it.
    IncompleteRange,
    /// An opening parenthesis that was never closed.
    UnterminatedGroup,
    /// A closing parenthesis with no open group.
    UnmatchedParen,
    /// A token that cannot appear at its position.
    UnexpectedToken,
    /// A range whose lower bound exceeds its upper bound.
    InvertedRange,
    /// A field name outside the recognized-field set.
    UnknownField,
    /// A value or operator incompatible with the field's type.
    TypeMismatch,
}

impl DiagnosticCode {
    /// The code's stable string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DanglingColon => "dangling-colon",
            Self::IncompleteComparison => "incomplete-comparison",
            Self::IncompleteRange => "incomplete-range",
            Self::UnterminatedGroup => "unterminated-group",
            Self::UnmatchedParen => "unmatched-paren",
            Self::UnexpectedToken => "unexpected-token",
            Self::InvertedRange => "inverted-range",
            Self::UnknownField => "unknown-field",
            Self::TypeMismatch => "type-mismatch",
        }
    }
}

/// A non-fatal note attached to a degraded parse or normalization result.
///
/// Parser diagnostics carry the source position of the offending token.
/// Normalizer diagnostics operate on position-free AST nodes and carry none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Stable condition identifier.
    pub code: DiagnosticCode,
    /// Human-readable description.
    pub message: String,
    /// Position of the offending token, when known.
    pub position: Option<Position>,
}

impl Diagnostic {
    /// Creates a diagnostic with a source position.
    pub fn at(code: DiagnosticCode, message: impl Into<String>, position: Position) -> Self {
        Self {
            code,
            message: message.into(),
            position: Some(position),
        }
    }

    /// Creates a position-free diagnostic.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            position: None,
        }
    }

    /// Formats the diagnostic against the original input with a caret
    /// indicator under the offending position.
    pub fn format_with_context(&self, input: &str) -> String {
        let mut result = String::new();
        result.push_str(&format!("{self}\n"));
        if let Some(position) = self.position {
            let line = input.lines().nth(position.line - 1).unwrap_or("");
            result.push_str(&format!("  {line}\n"));
            result.push_str(&format!("  {}^", " ".repeat(position.column - 1)));
        }
        result
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(p) => write!(
                f,
                "{}: {} (line {}, column {})",
                self.code.as_str(),
                self.message,
                p.line,
                p.column
            ),
            None => write!(f, "{}: {}", self.code.as_str(), self.message),
        }
    }
}

/// Error returned by the strict parse entry point when the tolerant pipeline
/// would have degraded part of the query.
#[derive(Debug, Clone, Error)]
#[error("invalid query: {message}")]
pub struct QueryError {
    /// Message of the first diagnostic.
    pub message: String,
    /// All diagnostics the pipeline produced.
    pub diagnostics: Vec<Diagnostic>,
}

impl QueryError {
    /// Builds an error from a non-empty diagnostics list.
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        let message = diagnostics
            .first()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        Self {
            message,
            diagnostics,
        }
    }
}

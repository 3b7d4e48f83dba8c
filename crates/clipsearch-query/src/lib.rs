//! Search query parsing, normalization, and filter serialization for
//! clipsearch.
//!
//! This crate turns a free-text search string into a structured filter a
//! search backend can execute:
//!
//! - **Terms**: `clutch` - words that must appear
//! - **Phrases**: `"triple kill"` - exact sequences
//! - **Negation**: `-nsfw` - terms that must NOT appear
//! - **OR**: `valorant OR csgo` - alternatives
//! - **Grouping**: `(a b) OR (c d)` - precedence control
//! - **Field filters**: `game:valorant`, `votes:>50`, `duration:10..20` -
//!   constraints on named attributes
//!
//! The pipeline is `tokenize → parse → normalize → serialize`, and it never
//! fails: malformed input degrades to literal terms, with a [`Diagnostic`]
//! recorded for each degradation, so a search box always gets *some*
//! actionable filter back. Every stage is a pure function with no shared
//! state, safe to call concurrently on every keystroke.
//!
//! # Example
//!
//! ```
//! use clipsearch_query::parse_query;
//!
//! let parsed = parse_query("(game:valorant OR game:csgo) tag:clutch -is:nsfw");
//! assert!(parsed.diagnostics.is_empty());
//! assert_eq!(parsed.filter.filters[0].field, "tag");
//! ```

#![warn(missing_docs)]

mod ast;
mod error;
mod lexer;
mod normalize;
mod parser;
mod serialize;

pub use ast::{FilterOperator, FilterValue, QueryExpr};
pub use error::{Diagnostic, DiagnosticCode, QueryError};
pub use lexer::{Position, Token, TokenKind, tokenize};
pub use normalize::{FieldKind, FieldTable, NormalizeOutput, normalize};
pub use parser::{ParseOutput, parse};
pub use serialize::{FilterParam, StructuredFilter, SubExpr, serialize};

/// The composed result of the full pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    /// The structured filter, empty for empty input.
    pub filter: StructuredFilter,
    /// Diagnostics accumulated across parsing and normalization.
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs the full pipeline with the default recognized-field table.
///
/// Never fails: for any input this returns a best-effort filter plus the
/// diagnostics describing what was degraded along the way.
pub fn parse_query(input: &str) -> ParsedQuery {
    parse_query_with(input, &FieldTable::default())
}

/// Runs the full pipeline against a caller-supplied field table.
pub fn parse_query_with(input: &str, fields: &FieldTable) -> ParsedQuery {
    let tokens = tokenize(input);
    let parsed = parse(&tokens);
    let mut diagnostics = parsed.diagnostics;

    let expr = parsed.expr.map(|expr| {
        let normalized = normalize(expr, fields);
        diagnostics.extend(normalized.diagnostics);
        normalized.expr
    });

    ParsedQuery {
        filter: serialize(expr.as_ref()),
        diagnostics,
    }
}

/// Strict variant of [`parse_query`]: fails if the tolerant pipeline would
/// have degraded any part of the query.
///
/// Useful for tooling and saved-search validation, where reporting a mistake
/// beats approximating it.
pub fn parse_query_strict(input: &str) -> Result<StructuredFilter, QueryError> {
    let parsed = parse_query(input);
    if parsed.diagnostics.is_empty() {
        Ok(parsed.filter)
    } else {
        Err(QueryError::from_diagnostics(parsed.diagnostics))
    }
}

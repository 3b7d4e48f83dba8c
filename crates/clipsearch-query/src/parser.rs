//! Query parser.
//!
//! Parses a token stream into a query AST using recursive descent. Parsing
//! never fails: malformed constructs degrade to literal terms and each
//! degradation is reported as a diagnostic alongside the best-effort tree.
//!
//! # Grammar
//!
//! ```text
//! query      → or_expr
//! or_expr    → and_expr ("OR" and_expr)*
//! and_expr   → term+
//! term       → "-" term | atom
//! atom       → WORD | PHRASE | NUMBER | "(" or_expr ")" | field_filter
//! field_filter → (WORD | PHRASE) ":" filter_value
//! filter_value → WORD | PHRASE | NUMBER
//!              | COMPARISON (NUMBER | WORD)
//!              | NUMBER ".." NUMBER
//! ```
//!
//! # Precedence (highest to lowest)
//!
//! 1. Grouping: `(...)`
//! 2. Field filter: `field:`
//! 3. Negation: `-`
//! 4. AND (implicit, between adjacent terms)
//! 5. OR (explicit keyword)
//!
//! The field-filter production is speculative: the parser commits to a filter
//! only once a valid value is found, and otherwise rolls the cursor back and
//! emits the field name as a plain term.

use crate::{
    ast::{FilterOperator, FilterValue, QueryExpr},
    error::{Diagnostic, DiagnosticCode},
    lexer::{Token, TokenKind},
};

/// Result of a parse: the best-effort tree (None when the input held no
/// meaningful tokens) plus accumulated diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    /// The parsed expression, if any meaningful tokens were present.
    pub expr: Option<QueryExpr>,
    /// Diagnostics for every degraded or skipped construct.
    pub diagnostics: Vec<Diagnostic>,
}

/// Recursive descent parser over a lexed token stream.
struct Parser<'a> {
    /// Token stream to parse; always terminated by an Eof token.
    tokens: &'a [Token],
    /// Current position in the token stream.
    position: usize,
    /// Open parenthesis depth, for routing stray `)` tokens.
    depth: usize,
    /// Diagnostics accumulated so far.
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    /// Creates a parser over the given tokens.
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Parses the whole stream.
    fn parse(mut self) -> ParseOutput {
        let expr = self.parse_or_expr();
        ParseOutput {
            expr,
            diagnostics: self.diagnostics,
        }
    }

    /// Parses: or_expr → and_expr ("OR" and_expr)*
    fn parse_or_expr(&mut self) -> Option<QueryExpr> {
        let mut branches = Vec::new();

        loop {
            if let Some(expr) = self.parse_and_expr() {
                branches.push(expr);
            }

            if self.current().kind != TokenKind::Or {
                break;
            }
            let or_token = self.current().clone();
            self.advance();

            if branches.is_empty() {
                self.diagnostics.push(Diagnostic::at(
                    DiagnosticCode::UnexpectedToken,
                    "OR with no expression before it",
                    or_token.position,
                ));
            } else if self.current().kind == TokenKind::Or {
                self.diagnostics.push(Diagnostic::at(
                    DiagnosticCode::UnexpectedToken,
                    "OR directly followed by another OR",
                    self.current().position,
                ));
            } else if !self.can_start_term() {
                self.diagnostics.push(Diagnostic::at(
                    DiagnosticCode::UnexpectedToken,
                    "OR with no expression after it",
                    or_token.position,
                ));
            }
        }

        match branches.len() {
            0 => None,
            1 => branches.into_iter().next(),
            _ => Some(QueryExpr::or(branches)),
        }
    }

    /// Parses: and_expr → term+
    ///
    /// Tokens that cannot appear at term position are skipped with a
    /// diagnostic so the rest of the query still parses.
    fn parse_and_expr(&mut self) -> Option<QueryExpr> {
        let mut children = Vec::new();

        loop {
            let token = self.current().clone();
            match token.kind {
                TokenKind::Word
                | TokenKind::Phrase
                | TokenKind::Number
                | TokenKind::Negation
                | TokenKind::LParen => {
                    if let Some(expr) = self.parse_term() {
                        children.push(expr);
                    }
                }
                TokenKind::RParen if self.depth > 0 => break,
                TokenKind::RParen => {
                    self.diagnostics.push(Diagnostic::at(
                        DiagnosticCode::UnmatchedParen,
                        "closing parenthesis with no open group",
                        token.position,
                    ));
                    self.advance();
                }
                TokenKind::Colon | TokenKind::Comparison | TokenKind::Range => {
                    self.diagnostics.push(Diagnostic::at(
                        DiagnosticCode::UnexpectedToken,
                        format!("unexpected '{}'", token.value),
                        token.position,
                    ));
                    self.advance();
                }
                TokenKind::Or | TokenKind::Eof => break,
            }
        }

        match children.len() {
            0 => None,
            1 => children.into_iter().next(),
            _ => Some(QueryExpr::and(children)),
        }
    }

    /// Parses: term → "-" term | atom
    fn parse_term(&mut self) -> Option<QueryExpr> {
        if self.current().kind == TokenKind::Negation {
            let negation = self.current().clone();
            self.advance();
            return match self.parse_term() {
                Some(inner) => Some(QueryExpr::Not(Box::new(inner))),
                None => {
                    self.diagnostics.push(Diagnostic::at(
                        DiagnosticCode::UnexpectedToken,
                        "negation with nothing to negate",
                        negation.position,
                    ));
                    None
                }
            };
        }

        self.parse_atom()
    }

    /// Parses: atom → WORD | PHRASE | NUMBER | group | field_filter
    fn parse_atom(&mut self) -> Option<QueryExpr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Word | TokenKind::Phrase => {
                // A word or phrase directly followed by a colon is a field
                // name, never a bare term.
                if self.peek_kind(1) == Some(TokenKind::Colon) {
                    return Some(self.parse_field_filter());
                }
                self.advance();
                if token.kind == TokenKind::Word {
                    Some(QueryExpr::Term(token.value))
                } else {
                    Some(QueryExpr::Phrase(token.value))
                }
            }
            TokenKind::Number => {
                self.advance();
                Some(QueryExpr::Term(token.value))
            }
            TokenKind::LParen => self.parse_group(),
            _ => None,
        }
    }

    /// Parses a parenthesized group. A missing `)` keeps the partial content
    /// and emits an unterminated-group diagnostic.
    fn parse_group(&mut self) -> Option<QueryExpr> {
        let open = self.current().clone();
        self.advance(); // consume (
        self.depth += 1;
        let inner = self.parse_or_expr();
        self.depth -= 1;

        if self.current().kind == TokenKind::RParen {
            self.advance();
        } else {
            self.diagnostics.push(Diagnostic::at(
                DiagnosticCode::UnterminatedGroup,
                "unterminated group: missing closing parenthesis",
                open.position,
            ));
        }

        inner
    }

    /// Parses a field filter after seeing `name ":"`. Commits only once a
    /// valid value is found; otherwise degrades the field name to a term.
    ///
    /// On entry the cursor is at the field-name token.
    fn parse_field_filter(&mut self) -> QueryExpr {
        let field = self.current().clone();
        self.advance(); // consume field name
        let colon = self.current().clone();
        self.advance(); // consume colon
        let value_start = self.position;

        match self.current().kind {
            TokenKind::Word => {
                // Speculative: if the word is itself followed by a colon it
                // is the next filter's field name, so this filter has no
                // value. Roll back to just after the colon and degrade.
                if self.peek_kind(1) == Some(TokenKind::Colon) {
                    self.position = value_start;
                    return self.degrade_dangling(&field, &colon);
                }
                let value = self.current().value.clone();
                self.advance();
                QueryExpr::filter(field.value, FilterOperator::Eq, FilterValue::Text(value))
            }

            TokenKind::Phrase => {
                let value = self.current().value.clone();
                self.advance();
                QueryExpr::filter(field.value, FilterOperator::Eq, FilterValue::Text(value))
            }

            TokenKind::Number => self.parse_number_value(field),

            TokenKind::Comparison => self.parse_comparison_value(field),

            _ => self.degrade_dangling(&field, &colon),
        }
    }

    /// Parses `NUMBER` or `NUMBER ".." NUMBER` as a filter value. The cursor
    /// is at the first number.
    fn parse_number_value(&mut self, field: Token) -> QueryExpr {
        let first = self.current().clone();
        self.advance();

        if self.current().kind != TokenKind::Range {
            return QueryExpr::filter(
                field.value,
                FilterOperator::Eq,
                FilterValue::Number(parse_number(&first.value)),
            );
        }

        let range = self.current().clone();
        self.advance(); // consume ..

        if self.current().kind != TokenKind::Number {
            self.diagnostics.push(Diagnostic::at(
                DiagnosticCode::IncompleteRange,
                format!("range for field '{}' is missing its upper bound", field.value),
                range.position,
            ));
            return QueryExpr::Term(field.value);
        }

        let second = self.current().clone();
        self.advance();

        let min = parse_number(&first.value);
        let max = parse_number(&second.value);
        if min > max {
            self.diagnostics.push(Diagnostic::at(
                DiagnosticCode::InvertedRange,
                format!(
                    "range for field '{}' has min {} greater than max {}",
                    field.value, first.value, second.value
                ),
                first.position,
            ));
        }

        QueryExpr::filter(
            field.value,
            FilterOperator::Range,
            FilterValue::Range { min, max },
        )
    }

    /// Parses `COMPARISON (NUMBER | WORD)` as a filter value. The cursor is
    /// at the comparison token. Words are accepted so date-like values
    /// (`after:>2024-01-15`) parse; the normalizer enforces value types.
    fn parse_comparison_value(&mut self, field: Token) -> QueryExpr {
        let comparison = self.current().clone();
        self.advance();

        let Some(operator) = FilterOperator::from_comparison(&comparison.value) else {
            self.diagnostics.push(Diagnostic::at(
                DiagnosticCode::IncompleteComparison,
                format!("unrecognized comparison '{}'", comparison.value),
                comparison.position,
            ));
            return QueryExpr::Term(field.value);
        };

        match self.current().kind {
            TokenKind::Number => {
                let value = parse_number(&self.current().value);
                self.advance();
                QueryExpr::filter(field.value, operator, FilterValue::Number(value))
            }
            TokenKind::Word => {
                let value = self.current().value.clone();
                self.advance();
                QueryExpr::filter(field.value, operator, FilterValue::Text(value))
            }
            _ => {
                self.diagnostics.push(Diagnostic::at(
                    DiagnosticCode::IncompleteComparison,
                    format!(
                        "comparison for field '{}' is missing a value",
                        field.value
                    ),
                    comparison.position,
                ));
                QueryExpr::Term(field.value)
            }
        }
    }

    /// Degrades `field:` with no usable value to a plain term.
    fn degrade_dangling(&mut self, field: &Token, colon: &Token) -> QueryExpr {
        self.diagnostics.push(Diagnostic::at(
            DiagnosticCode::DanglingColon,
            format!("field '{}' has no value", field.value),
            colon.position,
        ));
        QueryExpr::Term(field.value.clone())
    }

    /// Whether the current token can start a term.
    fn can_start_term(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Word
                | TokenKind::Phrase
                | TokenKind::Number
                | TokenKind::Negation
                | TokenKind::LParen
        )
    }

    /// The current token. The stream's trailing Eof is sticky, so this is
    /// always valid.
    fn current(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    /// The kind of the token `n` positions ahead, if any.
    fn peek_kind(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.position + n).map(|t| t.kind)
    }

    /// Advances past the current token, stopping at the trailing Eof.
    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }
}

/// Parses a digit-run token value. Values too large for f64 precision are
/// saturated by the float parse itself.
fn parse_number(text: &str) -> f64 {
    text.parse().unwrap_or(0.0)
}

/// Parses a token stream into a query AST.
///
/// Never fails. Returns no expression (and no diagnostics) when the stream
/// holds only the Eof token.
pub fn parse(tokens: &[Token]) -> ParseOutput {
    if tokens.is_empty() {
        return ParseOutput {
            expr: None,
            diagnostics: Vec::new(),
        };
    }
    Parser::new(tokens).parse()
}

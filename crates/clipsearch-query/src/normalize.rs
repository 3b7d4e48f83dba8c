//! Filter normalization.
//!
//! Validates field filters against the recognized-field table and rewrites
//! anything unrecognized or ill-typed into a literal term rather than
//! dropping it. The pass is a single top-down rebuild, never mutates its
//! input in place, and is idempotent: degraded filters become plain terms,
//! which pass through unchanged on any later run.

use std::collections::HashMap;

use crate::{
    ast::{FilterOperator, FilterValue, QueryExpr},
    error::{Diagnostic, DiagnosticCode},
};

/// The type discipline of a recognized field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free-text match (game, tag, creator). Equality only.
    Text,
    /// Numeric constraint (votes, duration). Any operator, numeric values.
    Numeric,
    /// Date constraint (after, before). Any operator, date-like values.
    Date,
    /// Closed-vocabulary flag (is, sort). Equality only.
    Keyword,
}

/// The set of field names the normalizer recognizes, with their kinds.
///
/// Lookup is case-insensitive; recognized filters come out with lowercased
/// field names.
#[derive(Debug, Clone)]
pub struct FieldTable {
    /// Lowercased field name to kind.
    fields: HashMap<String, FieldKind>,
}

impl FieldTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Adds a field to the table.
    pub fn with_field(mut self, name: &str, kind: FieldKind) -> Self {
        self.fields.insert(name.to_lowercase(), kind);
        self
    }

    /// Looks up a field name case-insensitively.
    pub fn kind(&self, name: &str) -> Option<FieldKind> {
        self.fields.get(&name.to_lowercase()).copied()
    }
}

impl Default for FieldTable {
    /// The clip-discovery field set.
    fn default() -> Self {
        Self::new()
            .with_field("game", FieldKind::Text)
            .with_field("tag", FieldKind::Text)
            .with_field("creator", FieldKind::Text)
            .with_field("votes", FieldKind::Numeric)
            .with_field("duration", FieldKind::Numeric)
            .with_field("after", FieldKind::Date)
            .with_field("before", FieldKind::Date)
            .with_field("is", FieldKind::Keyword)
            .with_field("sort", FieldKind::Keyword)
    }
}

/// Result of normalization: the rewritten tree plus diagnostics for every
/// degraded filter.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutput {
    /// The normalized expression.
    pub expr: QueryExpr,
    /// One diagnostic per degraded filter.
    pub diagnostics: Vec<Diagnostic>,
}

/// Normalizes a query expression against a field table.
pub fn normalize(expr: QueryExpr, fields: &FieldTable) -> NormalizeOutput {
    let mut diagnostics = Vec::new();
    let expr = normalize_expr(expr, fields, &mut diagnostics);
    NormalizeOutput { expr, diagnostics }
}

/// Recursive rewrite. Structural nodes are rebuilt around normalized
/// children; only field filters can change shape.
fn normalize_expr(
    expr: QueryExpr,
    fields: &FieldTable,
    diagnostics: &mut Vec<Diagnostic>,
) -> QueryExpr {
    match expr {
        QueryExpr::Term(_) | QueryExpr::Phrase(_) => expr,
        QueryExpr::Not(inner) => {
            QueryExpr::Not(Box::new(normalize_expr(*inner, fields, diagnostics)))
        }
        QueryExpr::And(children) => QueryExpr::and(
            children
                .into_iter()
                .map(|c| normalize_expr(c, fields, diagnostics))
                .collect(),
        ),
        QueryExpr::Or(children) => QueryExpr::or(
            children
                .into_iter()
                .map(|c| normalize_expr(c, fields, diagnostics))
                .collect(),
        ),
        QueryExpr::Filter {
            field,
            operator,
            value,
        } => normalize_filter(field, operator, value, fields, diagnostics),
    }
}

/// Validates one filter, returning either the (possibly coerced) filter or
/// its literal-term degradation.
fn normalize_filter(
    field: String,
    operator: FilterOperator,
    value: FilterValue,
    fields: &FieldTable,
    diagnostics: &mut Vec<Diagnostic>,
) -> QueryExpr {
    let Some(kind) = fields.kind(&field) else {
        diagnostics.push(Diagnostic::new(
            DiagnosticCode::UnknownField,
            format!("unknown field '{field}'"),
        ));
        return degrade(&field, operator, &value);
    };

    let lowered = field.to_lowercase();

    match kind {
        FieldKind::Text | FieldKind::Keyword => {
            if operator != FilterOperator::Eq {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::TypeMismatch,
                    format!("field '{lowered}' does not support comparison operators"),
                ));
                return degrade(&field, operator, &value);
            }
            // Numbers are perfectly good text values (tag:360).
            let value = match value {
                FilterValue::Number(n) => FilterValue::Text(crate::ast::format_number(n)),
                FilterValue::Text(_) => value,
                FilterValue::Range { .. } => {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticCode::TypeMismatch,
                        format!("field '{lowered}' does not support ranges"),
                    ));
                    return degrade(&field, operator, &value);
                }
            };
            QueryExpr::filter(lowered, FilterOperator::Eq, value)
        }

        FieldKind::Numeric => match value {
            FilterValue::Number(_) | FilterValue::Range { .. } => {
                QueryExpr::filter(lowered, operator, value)
            }
            FilterValue::Text(_) => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::TypeMismatch,
                    format!("field '{lowered}' requires a numeric value"),
                ));
                degrade(&field, operator, &value)
            }
        },

        FieldKind::Date => match &value {
            FilterValue::Number(_) | FilterValue::Range { .. } => {
                QueryExpr::filter(lowered, operator, value)
            }
            FilterValue::Text(text) if is_date_like(text) => {
                QueryExpr::filter(lowered, operator, value)
            }
            FilterValue::Text(_) => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::TypeMismatch,
                    format!("field '{lowered}' requires a date-like value"),
                ));
                degrade(&field, operator, &value)
            }
        },
    }
}

/// Rewrites a rejected filter to a term holding its literal query text.
fn degrade(field: &str, operator: FilterOperator, value: &FilterValue) -> QueryExpr {
    QueryExpr::Term(format!(
        "{field}:{}{}",
        operator.symbol(),
        value.to_query_string()
    ))
}

/// Whether a text value looks like a date: digits and hyphens only, starting
/// with a digit (`2024-01-15`, `2024`).
fn is_date_like(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(|c| c.is_ascii_digit())
        && text.chars().all(|c| c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Normalizes against the default table.
    fn run(expr: QueryExpr) -> NormalizeOutput {
        normalize(expr, &FieldTable::default())
    }

    fn eq_text(field: &str, value: &str) -> QueryExpr {
        QueryExpr::filter(field, FilterOperator::Eq, FilterValue::Text(value.into()))
    }

    #[test]
    fn recognized_filter_untouched() {
        let output = run(eq_text("game", "valorant"));
        assert_eq!(output.expr, eq_text("game", "valorant"));
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn unknown_field_degrades_to_term() {
        let output = run(eq_text("foo", "bar"));
        assert_eq!(output.expr, QueryExpr::Term("foo:bar".into()));
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].code, DiagnosticCode::UnknownField);
    }

    #[test]
    fn field_lookup_case_insensitive() {
        let output = run(eq_text("Game", "valorant"));
        assert_eq!(output.expr, eq_text("game", "valorant"));
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn comparison_on_text_field_degrades() {
        let filter = QueryExpr::filter("game", FilterOperator::Gt, FilterValue::Number(5.0));
        let output = run(filter);
        assert_eq!(output.expr, QueryExpr::Term("game:>5".into()));
        assert_eq!(output.diagnostics[0].code, DiagnosticCode::TypeMismatch);
    }

    #[test]
    fn text_value_on_numeric_field_degrades() {
        let filter = QueryExpr::filter("votes", FilterOperator::Eq, FilterValue::Text("many".into()));
        let output = run(filter);
        assert_eq!(output.expr, QueryExpr::Term("votes:many".into()));
        assert_eq!(output.diagnostics[0].code, DiagnosticCode::TypeMismatch);
    }

    #[test]
    fn phrase_value_on_numeric_field_degrades() {
        let filter = QueryExpr::filter(
            "votes",
            FilterOperator::Eq,
            FilterValue::Text("a lot".into()),
        );
        let output = run(filter);
        assert_eq!(output.expr, QueryExpr::Term("votes:\"a lot\"".into()));
        assert_eq!(output.diagnostics.len(), 1);
    }

    #[test]
    fn range_on_text_field_degrades() {
        let filter = QueryExpr::filter(
            "game",
            FilterOperator::Range,
            FilterValue::Range { min: 10.0, max: 20.0 },
        );
        let output = run(filter);
        assert_eq!(output.expr, QueryExpr::Term("game:10..20".into()));
        assert_eq!(output.diagnostics[0].code, DiagnosticCode::TypeMismatch);
    }

    #[test]
    fn number_coerced_to_text_on_text_field() {
        let filter = QueryExpr::filter("tag", FilterOperator::Eq, FilterValue::Number(360.0));
        let output = run(filter);
        assert_eq!(output.expr, eq_text("tag", "360"));
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn numeric_range_accepted() {
        let filter = QueryExpr::filter(
            "duration",
            FilterOperator::Range,
            FilterValue::Range { min: 10.0, max: 20.0 },
        );
        let output = run(filter.clone());
        assert_eq!(output.expr, filter);
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn date_field_accepts_date_like_text() {
        let filter = QueryExpr::filter(
            "after",
            FilterOperator::Gt,
            FilterValue::Text("2024-01-15".into()),
        );
        let output = run(filter.clone());
        assert_eq!(output.expr, filter);
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn date_field_rejects_plain_word() {
        let filter = QueryExpr::filter(
            "after",
            FilterOperator::Gt,
            FilterValue::Text("yesterday".into()),
        );
        let output = run(filter);
        assert_eq!(output.expr, QueryExpr::Term("after:>yesterday".into()));
        assert_eq!(output.diagnostics[0].code, DiagnosticCode::TypeMismatch);
    }

    #[test]
    fn structure_preserved_around_degraded_filter() {
        let expr = QueryExpr::And(vec![
            QueryExpr::Term("clutch".into()),
            QueryExpr::Not(Box::new(eq_text("foo", "bar"))),
        ]);
        let output = run(expr);
        assert_eq!(
            output.expr,
            QueryExpr::And(vec![
                QueryExpr::Term("clutch".into()),
                QueryExpr::Not(Box::new(QueryExpr::Term("foo:bar".into()))),
            ])
        );
        assert_eq!(output.diagnostics.len(), 1);
    }

    #[test]
    fn idempotent() {
        let inputs = vec![
            eq_text("game", "valorant"),
            eq_text("foo", "bar"),
            QueryExpr::And(vec![
                eq_text("Game", "csgo"),
                QueryExpr::filter("votes", FilterOperator::Gt, FilterValue::Text("x".into())),
                QueryExpr::Or(vec![
                    QueryExpr::Term("a".into()),
                    QueryExpr::Phrase("b c".into()),
                ]),
            ]),
        ];
        for input in inputs {
            let once = run(input);
            let twice = run(once.expr.clone());
            assert_eq!(once.expr, twice.expr);
            assert!(twice.diagnostics.is_empty());
        }
    }

    #[test]
    fn custom_table() {
        let table = FieldTable::new().with_field("lang", FieldKind::Text);
        let output = normalize(eq_text("lang", "rust"), &table);
        assert!(output.diagnostics.is_empty());
        let output = normalize(eq_text("game", "valorant"), &table);
        assert_eq!(output.diagnostics.len(), 1);
    }
}

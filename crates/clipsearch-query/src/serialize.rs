//! Filter serialization.
//!
//! Flattens a normalized query AST into a backend-agnostic structured filter
//! suitable for transmission as query parameters. This is a pure structural
//! transform; validation has already happened in the normalizer.
//!
//! Top-level AND children are routed by shape: field filters land in
//! `filters`, negations in `must_not`, everything else in `must`. OR groups
//! are preserved as nested sub-expressions so downstream consumers can
//! reconstruct boolean semantics exactly.

use serde::{Deserialize, Serialize};

use crate::ast::{FilterOperator, FilterValue, QueryExpr};

/// A flattened field constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterParam {
    /// Field name (lowercased by the normalizer).
    pub field: String,
    /// Comparison semantics.
    pub operator: FilterOperator,
    /// Constraining value.
    pub value: FilterValue,
}

/// A boolean sub-expression within a structured filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SubExpr {
    /// A free-text term.
    Term {
        /// The term text.
        text: String,
    },
    /// An exact-match phrase.
    Phrase {
        /// The phrase text.
        text: String,
    },
    /// A field constraint nested inside a group.
    Filter(FilterParam),
    /// Negation of a nested sub-expression.
    Not {
        /// The negated sub-expression.
        expr: Box<SubExpr>,
    },
    /// Conjunction of nested sub-expressions.
    All {
        /// The AND-ed sub-expressions.
        exprs: Vec<SubExpr>,
    },
    /// Disjunction of nested sub-expressions (a preserved OR group).
    Any {
        /// The OR-ed sub-expressions.
        exprs: Vec<SubExpr>,
    },
}

/// The backend-transport-friendly result of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredFilter {
    /// AND-ed top-level terms and groups.
    pub must: Vec<SubExpr>,
    /// Collected negation targets.
    pub must_not: Vec<SubExpr>,
    /// Flattened top-level field filters.
    pub filters: Vec<FilterParam>,
}

impl StructuredFilter {
    /// Whether the filter constrains anything at all.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty() && self.filters.is_empty()
    }

    /// Renders the filter back to query-string form. Re-parsing the result
    /// reconstructs an equal filter for any input the pipeline produced from
    /// well-formed queries.
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for sub in &self.must {
            parts.push(render_operand(sub));
        }
        for param in &self.filters {
            parts.push(render_param(param));
        }
        for sub in &self.must_not {
            parts.push(format!("-{}", render_operand(sub)));
        }
        parts.join(" ")
    }
}

/// Serializes a normalized AST into a structured filter. `None` (an empty
/// query) produces an empty filter.
pub fn serialize(expr: Option<&QueryExpr>) -> StructuredFilter {
    let mut filter = StructuredFilter::default();
    match expr {
        None => filter,
        Some(QueryExpr::And(children)) => {
            for child in children {
                route(child, &mut filter);
            }
            filter
        }
        Some(other) => {
            route(other, &mut filter);
            filter
        }
    }
}

/// Routes one top-level conjunct into the appropriate bucket.
fn route(expr: &QueryExpr, filter: &mut StructuredFilter) {
    match expr {
        QueryExpr::Filter {
            field,
            operator,
            value,
        } => filter.filters.push(FilterParam {
            field: field.clone(),
            operator: *operator,
            value: value.clone(),
        }),
        QueryExpr::Not(inner) => filter.must_not.push(to_sub_expr(inner)),
        other => filter.must.push(to_sub_expr(other)),
    }
}

/// Converts an AST node into a nested sub-expression.
fn to_sub_expr(expr: &QueryExpr) -> SubExpr {
    match expr {
        QueryExpr::Term(text) => SubExpr::Term { text: text.clone() },
        QueryExpr::Phrase(text) => SubExpr::Phrase { text: text.clone() },
        QueryExpr::Filter {
            field,
            operator,
            value,
        } => SubExpr::Filter(FilterParam {
            field: field.clone(),
            operator: *operator,
            value: value.clone(),
        }),
        QueryExpr::Not(inner) => SubExpr::Not {
            expr: Box::new(to_sub_expr(inner)),
        },
        QueryExpr::And(children) => SubExpr::All {
            exprs: children.iter().map(to_sub_expr).collect(),
        },
        QueryExpr::Or(children) => SubExpr::Any {
            exprs: children.iter().map(to_sub_expr).collect(),
        },
    }
}

/// Renders a sub-expression, parenthesizing groups so the result re-parses
/// with the same precedence.
fn render_operand(sub: &SubExpr) -> String {
    match sub {
        SubExpr::Term { text } => text.clone(),
        SubExpr::Phrase { text } => format!("\"{}\"", text.replace('"', "\\\"")),
        SubExpr::Filter(param) => render_param(param),
        SubExpr::Not { expr } => format!("-{}", render_operand(expr)),
        SubExpr::All { exprs } => {
            let parts: Vec<String> = exprs.iter().map(render_operand).collect();
            format!("({})", parts.join(" "))
        }
        SubExpr::Any { exprs } => {
            let parts: Vec<String> = exprs.iter().map(render_operand).collect();
            format!("({})", parts.join(" OR "))
        }
    }
}

/// Renders a flattened filter parameter.
fn render_param(param: &FilterParam) -> String {
    format!(
        "{}:{}{}",
        param.field,
        param.operator.symbol(),
        param.value.to_query_string()
    )
}

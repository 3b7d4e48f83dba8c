//! Query abstract syntax tree.
//!
//! Represents parsed query expressions before normalization and filter
//! serialization.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Comparison semantics of a field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Exact match (`field:value`).
    Eq,
    /// Greater than (`field:>n`).
    Gt,
    /// Greater than or equal (`field:>=n`).
    Gte,
    /// Less than (`field:<n`).
    Lt,
    /// Less than or equal (`field:<=n`).
    Lte,
    /// Inclusive range (`field:min..max`).
    Range,
}

impl FilterOperator {
    /// The operator's query-string spelling.
    ///
    /// Empty for equality, and for ranges too: the `..` is spelled inside
    /// the range value (`10..20`), not between field and value.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq | Self::Range => "",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    /// Maps a comparison token's text to its operator.
    pub fn from_comparison(text: &str) -> Option<Self> {
        match text {
            "=" => Some(Self::Eq),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            _ => None,
        }
    }
}

/// The value side of a field filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A numeric value.
    Number(f64),
    /// An inclusive numeric range.
    Range {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// A textual value (word or phrase).
    Text(String),
}

impl FilterValue {
    /// Renders the value in query-string form, quoting text that needs it.
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Number(n) => format_number(*n),
            Self::Range { min, max } => {
                format!("{}..{}", format_number(*min), format_number(*max))
            }
            Self::Text(text) => quote_if_needed(text),
        }
    }
}

/// A parsed query expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueryExpr {
    /// A single search term.
    Term(String),

    /// An exact-match phrase.
    Phrase(String),

    /// A field filter: one named attribute constrained by an operator.
    Filter {
        /// Field name as written (lowercased by the normalizer).
        field: String,
        /// Comparison semantics.
        operator: FilterOperator,
        /// The constraining value.
        value: FilterValue,
    },

    /// Negation: results must NOT match this expression.
    Not(Box<Self>),

    /// Conjunction: all sub-expressions must match.
    And(Vec<Self>),

    /// Disjunction: at least one sub-expression must match.
    Or(Vec<Self>),
}

impl QueryExpr {
    /// Creates an And expression, flattening nested Ands and unwrapping a
    /// single element.
    pub fn and(exprs: Vec<Self>) -> Self {
        let flattened: Vec<Self> = exprs
            .into_iter()
            .flat_map(|e| match e {
                Self::And(inner) => inner,
                other => vec![other],
            })
            .collect();

        match flattened.len() {
            0 => Self::And(vec![]),
            1 => flattened.into_iter().next().unwrap(),
            _ => Self::And(flattened),
        }
    }

    /// Creates an Or expression, flattening nested Ors and unwrapping a
    /// single element.
    pub fn or(exprs: Vec<Self>) -> Self {
        let flattened: Vec<Self> = exprs
            .into_iter()
            .flat_map(|e| match e {
                Self::Or(inner) => inner,
                other => vec![other],
            })
            .collect();

        match flattened.len() {
            0 => Self::Or(vec![]),
            1 => flattened.into_iter().next().unwrap(),
            _ => Self::Or(flattened),
        }
    }

    /// Creates a field filter expression.
    pub fn filter(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self::Filter {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Formats the expression as a tree structure with the given indentation.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        match self {
            Self::Term(s) => writeln!(f, "{prefix}Term({s:?})"),
            Self::Phrase(s) => writeln!(f, "{prefix}Phrase({s:?})"),
            Self::Filter {
                field,
                operator,
                value,
            } => writeln!(
                f,
                "{prefix}Filter({field:?} {op} {value})",
                op = match operator {
                    FilterOperator::Eq => "=",
                    FilterOperator::Range => "..",
                    other => other.symbol(),
                },
                value = value.to_query_string()
            ),
            Self::Not(inner) => {
                writeln!(f, "{prefix}Not")?;
                inner.fmt_tree(f, indent + 1)
            }
            Self::And(exprs) => {
                writeln!(f, "{prefix}And")?;
                for expr in exprs {
                    expr.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
            Self::Or(exprs) => {
                writeln!(f, "{prefix}Or")?;
                for expr in exprs {
                    expr.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
        }
    }

    /// Renders the expression back to query-string form.
    ///
    /// Parses of the result reconstruct the same expression for any tree the
    /// parser itself produced from well-formed input.
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Term(s) => s.clone(),
            Self::Phrase(s) => format!("\"{}\"", s.replace('"', "\\\"")),
            Self::Filter {
                field,
                operator,
                value,
            } => format!("{field}:{}{}", operator.symbol(), value.to_query_string()),
            Self::Not(inner) => format!("-{}", inner.fmt_operand()),
            Self::And(exprs) => {
                let parts: Vec<String> = exprs.iter().map(Self::fmt_operand).collect();
                parts.join(" ")
            }
            Self::Or(exprs) => {
                let parts: Vec<String> = exprs.iter().map(|e| e.to_query_string()).collect();
                parts.join(" OR ")
            }
        }
    }

    /// Renders the expression, parenthesizing groups so the result re-parses
    /// with the same precedence.
    fn fmt_operand(&self) -> String {
        match self {
            Self::And(_) | Self::Or(_) => format!("({})", self.to_query_string()),
            _ => self.to_query_string(),
        }
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

/// Formats a number without a trailing `.0` for whole values.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Quotes a text value when it would not survive re-lexing as a single word.
fn quote_if_needed(text: &str) -> String {
    let plain = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
    if plain {
        text.to_string()
    } else {
        format!("\"{}\"", text.replace('"', "\\\""))
    }
}

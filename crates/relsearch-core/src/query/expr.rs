//! Predicates and column references.

use super::render::quote_ident;
use super::select::SelectQuery;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The table a column reference is qualified with.
///
/// Correlated sub-queries reference both their own tables and the tables of
/// the enclosing query. Keeping the two apart lets aliases be re-pointed
/// structurally even when both sides share a canonical table name, as in
/// self-referencing relations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableRef {
    /// A table or alias in the same select (its `FROM` or a join).
    Named(String),
    /// A table or alias of the enclosing select.
    Outer(String),
}

impl TableRef {
    /// The qualifier as it appears in SQL.
    pub fn qualifier(&self) -> &str {
        match self {
            TableRef::Named(name) | TableRef::Outer(name) => name,
        }
    }
}

/// A table-qualified column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Qualifying table.
    pub table: TableRef,
    /// Column name.
    pub column: String,
}

impl ColumnRef {
    /// Column of a table in the current select.
    pub fn named(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: TableRef::Named(table.into()),
            column: column.into(),
        }
    }

    /// Column of a table in the enclosing select.
    pub fn outer(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: TableRef::Outer(table.into()),
            column: column.into(),
        }
    }

    /// The qualifier as it appears in SQL.
    pub fn qualifier(&self) -> &str {
        self.table.qualifier()
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", quote_ident(self.qualifier()), quote_ident(&self.column))
    }
}

/// Comparison operator accepted in the `where` slot of a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=` / `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `like`
    Like,
    /// `not like`
    NotLike,
    /// `ilike`
    ILike,
    /// `in` (set membership)
    In,
    /// `not in`
    NotIn,
}

impl Operator {
    /// Parse an operator token, case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        let normalized = token.trim().to_ascii_lowercase();
        let op = match normalized.as_str() {
            "=" => Operator::Eq,
            "!=" | "<>" => Operator::Ne,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "like" => Operator::Like,
            "not like" => Operator::NotLike,
            "ilike" => Operator::ILike,
            "in" => Operator::In,
            "not in" => Operator::NotIn,
            _ => return None,
        };
        Some(op)
    }

    /// Check if the operator takes a set rather than a scalar.
    pub fn is_set(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// SQL spelling.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "like",
            Operator::NotLike => "not like",
            Operator::ILike => "ilike",
            Operator::In => "in",
            Operator::NotIn => "not in",
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::parse(s).ok_or_else(|| format!("unsupported operator '{}'", s))
    }
}

impl TryFrom<String> for Operator {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_sql().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// How a condition combines with the conditions before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Boolean {
    /// `and`
    #[default]
    And,
    /// `or`
    Or,
}

impl Boolean {
    /// Pick `Or` when the flag is set.
    pub fn from_or(or: bool) -> Self {
        if or {
            Boolean::Or
        } else {
            Boolean::And
        }
    }

    /// SQL spelling.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Boolean::And => "and",
            Boolean::Or => "or",
        }
    }
}

/// A single predicate node.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column <op> value`
    Compare {
        column: ColumnRef,
        op: Operator,
        value: Value,
    },
    /// `column [not] in (values...)`
    InSet {
        column: ColumnRef,
        negated: bool,
        values: Vec<Value>,
    },
    /// `left <op> right`, used for key constraints.
    Columns {
        left: ColumnRef,
        op: Operator,
        right: ColumnRef,
    },
    /// `exists (sub-query)`
    Exists(Box<SelectQuery>),
}

impl Predicate {
    /// Build the predicate a criterion asks for.
    ///
    /// Set operators expand the value into a member list; everything else is
    /// a scalar comparison.
    pub fn for_operator(column: ColumnRef, op: Operator, value: Value) -> Self {
        if op.is_set() {
            Predicate::InSet {
                column,
                negated: op == Operator::NotIn,
                values: value.into_set(),
            }
        } else {
            Predicate::Compare { column, op, value }
        }
    }

    /// Equality between two columns.
    pub fn columns_eq(left: ColumnRef, right: ColumnRef) -> Self {
        Predicate::Columns {
            left,
            op: Operator::Eq,
            right,
        }
    }

    /// Column references held directly by this predicate (not inside sub-queries).
    pub fn columns_mut(&mut self) -> Vec<&mut ColumnRef> {
        match self {
            Predicate::Compare { column, .. } | Predicate::InSet { column, .. } => vec![column],
            Predicate::Columns { left, right, .. } => vec![left, right],
            Predicate::Exists(_) => Vec::new(),
        }
    }
}

/// A predicate together with its combinator.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Combinator with the preceding condition (ignored for the first one).
    pub boolean: Boolean,
    /// The predicate.
    pub predicate: Predicate,
}

impl Condition {
    /// An `and` condition.
    pub fn and(predicate: Predicate) -> Self {
        Self {
            boolean: Boolean::And,
            predicate,
        }
    }

    /// An `or` condition.
    pub fn or(predicate: Predicate) -> Self {
        Self {
            boolean: Boolean::Or,
            predicate,
        }
    }
}

//! Select statements.

use super::expr::{Boolean, ColumnRef, Condition, Predicate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A table in a `FROM` or `JOIN` clause, optionally aliased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSource {
    /// Canonical table name.
    pub table: String,
    /// Alias, if any.
    pub alias: Option<String>,
}

impl TableSource {
    /// An un-aliased table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: None,
        }
    }

    /// An aliased table.
    pub fn aliased(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: Some(alias.into()),
        }
    }

    /// Name the rest of the statement refers to this table by.
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}

/// Join kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `inner join`
    Inner,
    /// `left join`
    Left,
}

/// A join clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join kind.
    pub kind: JoinKind,
    /// Joined table.
    pub source: TableSource,
    /// `ON` conditions.
    pub on: Vec<Condition>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl Direction {
    /// Parse `asc` / `desc`, case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Direction::Asc),
            "desc" => Some(Direction::Desc),
            _ => None,
        }
    }

    /// SQL spelling.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// An `ORDER BY` term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Column to sort on.
    pub column: ColumnRef,
    /// Sort direction.
    pub direction: Direction,
}

/// A projected column set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// `*`
    All,
    /// `<table>.*`
    AllOf(String),
}

/// A select statement.
///
/// Conditions are kept as a flat list, each carrying the combinator that
/// joins it to the previous one, mirroring how ORM query builders accumulate
/// `where` / `orWhere` calls.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Projected columns; empty means `*`.
    pub projection: Vec<Projection>,
    /// Source table.
    pub from: TableSource,
    /// Join clauses in order.
    pub joins: Vec<Join>,
    /// Where conditions in order.
    pub wheres: Vec<Condition>,
    /// Order terms in order.
    pub order_by: Vec<OrderBy>,
}

impl SelectQuery {
    /// Select everything from a table.
    pub fn from_table(table: impl Into<String>) -> Self {
        Self {
            projection: Vec::new(),
            from: TableSource::new(table),
            joins: Vec::new(),
            wheres: Vec::new(),
            order_by: Vec::new(),
        }
    }

    /// Alias the source table.
    pub fn alias_from(&mut self, alias: impl Into<String>) {
        self.from.alias = Some(alias.into());
    }

    /// Append a condition.
    pub fn push_where(&mut self, boolean: Boolean, predicate: Predicate) {
        self.wheres.push(Condition { boolean, predicate });
    }

    /// Append an `and` condition.
    pub fn and_where(&mut self, predicate: Predicate) {
        self.push_where(Boolean::And, predicate);
    }

    /// Append a join.
    pub fn join(&mut self, kind: JoinKind, source: TableSource, on: Vec<Condition>) {
        self.joins.push(Join { kind, source, on });
    }

    /// Append a `left join`.
    pub fn left_join(&mut self, source: TableSource, on: Vec<Condition>) {
        self.join(JoinKind::Left, source, on);
    }

    /// Append an order term.
    pub fn order_by(&mut self, column: ColumnRef, direction: Direction) {
        self.order_by.push(OrderBy { column, direction });
    }

    /// Project all columns of one table.
    pub fn select_all_of(&mut self, table: impl Into<String>) {
        self.projection.push(Projection::AllOf(table.into()));
    }

    /// Number of `exists` conditions on this level.
    pub fn exists_count(&self) -> usize {
        self.wheres
            .iter()
            .filter(|c| matches!(c.predicate, Predicate::Exists(_)))
            .count()
    }

    /// Sub-queries of the `exists` conditions on this level.
    pub fn exists_subqueries(&self) -> impl Iterator<Item = &SelectQuery> {
        self.wheres.iter().filter_map(|c| match &c.predicate {
            Predicate::Exists(sub) => Some(sub.as_ref()),
            _ => None,
        })
    }

    /// Number of value predicates (comparisons and set tests) in the whole tree.
    pub fn value_predicate_count(&self) -> usize {
        self.wheres
            .iter()
            .map(|c| match &c.predicate {
                Predicate::Compare { .. } | Predicate::InSet { .. } => 1,
                Predicate::Exists(sub) => sub.value_predicate_count(),
                Predicate::Columns { .. } => 0,
            })
            .sum()
    }
}

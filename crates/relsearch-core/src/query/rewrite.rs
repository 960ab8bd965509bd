//! Re-pointing table references after a sub-query is aliased.

use super::expr::{ColumnRef, Condition, TableRef};
use super::select::SelectQuery;

/// Re-points column qualifiers inside a freshly built sub-query.
///
/// Relation sub-queries are built against canonical table names. Once the
/// sub-query's `FROM` is aliased, references to the related table must use
/// the alias, and references to the enclosing table must use whatever alias
/// the enclosing hop was given. Matching is on whole qualifiers of
/// [`TableRef`] handles, so `post` never matches `posts` or `blog_posts`.
#[derive(Debug, Clone)]
pub struct PredicateRewriter {
    related: (String, String),
    prior: Option<(String, String)>,
}

impl PredicateRewriter {
    /// Rewrite same-scope references to `table` as `alias`.
    pub fn new(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            related: (table.into(), alias.into()),
            prior: None,
        }
    }

    /// Also rewrite enclosing-scope references to `table` as `alias`.
    pub fn with_prior(mut self, table: impl Into<String>, alias: impl Into<String>) -> Self {
        self.prior = Some((table.into(), alias.into()));
        self
    }

    /// Rewrite a single column reference.
    pub fn rewrite_column(&self, column: &mut ColumnRef) {
        match &mut column.table {
            TableRef::Named(name) if *name == self.related.0 => {
                *name = self.related.1.clone();
            }
            TableRef::Outer(name) => {
                if let Some((table, alias)) = &self.prior {
                    if name == table {
                        *name = alias.clone();
                    }
                }
            }
            TableRef::Named(_) => {}
        }
    }

    /// Rewrite every condition in the list.
    pub fn rewrite_conditions(&self, conditions: &mut [Condition]) {
        for condition in conditions {
            for column in condition.predicate.columns_mut() {
                self.rewrite_column(column);
            }
        }
    }

    /// Rewrite the where and join conditions of a sub-query.
    ///
    /// Nested `exists` sub-queries are left alone; each hop rewrites its own.
    pub fn apply(&self, query: &mut SelectQuery) {
        self.rewrite_conditions(&mut query.wheres);
        for join in &mut query.joins {
            self.rewrite_conditions(&mut join.on);
        }
    }
}

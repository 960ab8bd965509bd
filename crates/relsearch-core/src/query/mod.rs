//! Query IR: a select with predicates, correlated sub-queries and joins.
//!
//! The IR is what the search compiler produces. It is rendered to SQL text
//! with positional bind parameters on demand and never executed here.

mod alias;
mod expr;
mod render;
mod rewrite;
mod select;

pub use alias::{AliasAllocator, EXISTS_ALIAS_PREFIX, JOIN_ALIAS_PREFIX};
pub use expr::{Boolean, ColumnRef, Condition, Operator, Predicate, TableRef};
pub use render::{is_plain_identifier, quote_ident, Sql};
pub use rewrite::PredicateRewriter;
pub use select::{Direction, Join, JoinKind, OrderBy, Projection, SelectQuery, TableSource};

//! Search requests and their compilation.
//!
//! A request is validated as a whole, then each item is compiled against its
//! entity: plain criteria become predicates on the entity's table, dotted
//! criteria walk relations into nested `exists` sub-queries, and a dotted
//! order path walks relations into a `left join` chain.

mod compiler;
mod filter;
mod order;
mod request;
mod validate;

pub use compiler::{SearchOptions, Searcher};
pub use request::{Criterion, OrderSpec, SearchItem, SearchRequest};
pub use validate::RuleSet;

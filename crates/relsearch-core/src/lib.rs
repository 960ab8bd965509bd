//! relsearch core - catalog, query IR and the search compiler.
//!
//! A search request names an entity by its registry key and lists criteria
//! against its columns. Dotted field paths (`posts.comments.body`) traverse
//! relations and compile into nested correlated `EXISTS` sub-queries; dotted
//! order paths compile into a `LEFT JOIN` chain.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use relsearch_core::{EntityDef, RelationDef, Registry, SearchRequest, Searcher};
//!
//! let registry = Registry::new()
//!     .with_entity(
//!         EntityDef::new("User", "users")
//!             .searchable_entity()
//!             .with_relation(RelationDef::has_many("posts", "Post", "user_id", "id")),
//!     )
//!     .with_entity(EntityDef::new("Post", "posts"))
//!     .expose("user", "User");
//!
//! let searcher = Searcher::new(Arc::new(registry));
//! let request: SearchRequest = serde_json::from_str(
//!     r#"[{"entity": "user", "criteria": [{"field": "posts.title", "where": "=", "value": "Hi"}]}]"#,
//! )
//! .unwrap();
//!
//! let query = searcher.compile(&request, None).unwrap();
//! assert!(query.to_sql().text.contains("exists"));
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod query;
pub mod search;
pub mod value;

pub use catalog::{AllowList, EntityDef, Leaves, Pivot, Registry, RelationDef, RelationKind, SearchableEntity};
pub use config::{HiddenFieldPolicy, SearchConfig};
pub use error::{Error, ErrorBag, ErrorKind, Result};
pub use query::{
    AliasAllocator, Boolean, ColumnRef, Condition, Direction, Operator, Predicate,
    PredicateRewriter, SelectQuery, Sql, TableRef, TableSource,
};
pub use search::{Criterion, OrderSpec, RuleSet, SearchItem, SearchOptions, SearchRequest, Searcher};
pub use value::Value;

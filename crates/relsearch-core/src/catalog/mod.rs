//! Entity catalog: definitions, relations and the search registry.

mod entity;
mod registry;
mod relation;

pub use entity::{AllowList, EntityDef, Leaves, SearchableEntity};
pub use registry::Registry;
pub use relation::{Pivot, RelationConstraint, RelationDef, RelationKind};

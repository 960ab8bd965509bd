//! Entity definitions and the searchable capability.

use super::relation::RelationDef;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

/// Capability every entity exposed to search implements.
///
/// [`EntityDef`] is the data-driven implementation loaded from
/// configuration; hand-written types can implement it directly.
pub trait SearchableEntity: Debug + Send + Sync {
    /// Entity name, used by relations to refer to it.
    fn name(&self) -> &str;

    /// Canonical table name.
    fn table(&self) -> &str;

    /// Whether the entity opted into search at all.
    fn is_searchable(&self) -> bool;

    /// Fields and relations permitted in order paths.
    fn allow_list(&self) -> &AllowList;

    /// Whether a field must never be filtered on through a relation.
    fn is_hidden(&self, field: &str) -> bool;

    /// Relations declared by the entity.
    fn relations(&self) -> &[RelationDef];

    /// Look up a relation by name.
    fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations().iter().find(|r| r.name == name)
    }
}

/// Leaf fields permitted behind an allow-listed relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leaves {
    /// Any leaf field.
    Any,
    /// Only the listed fields.
    Only(BTreeSet<String>),
}

impl Leaves {
    /// Check if a leaf field is permitted.
    pub fn permits(&self, field: &str) -> bool {
        match self {
            Leaves::Any => true,
            Leaves::Only(fields) => fields.contains(field),
        }
    }
}

/// Explicit allow-list of searchable fields and relations.
///
/// Deserializes from either a list of names (`["posts", "name"]`) or a map
/// of name to `"*"`, a single permitted leaf field, or a list of them
/// (`{"profile": ["country"], "posts": "*", "author": "name"}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "AllowListRepr")]
pub struct AllowList {
    entries: BTreeMap<String, Leaves>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LeavesRepr {
    Fields(Vec<String>),
    Single(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AllowListRepr {
    Names(Vec<String>),
    Map(BTreeMap<String, LeavesRepr>),
}

impl From<AllowListRepr> for AllowList {
    fn from(repr: AllowListRepr) -> Self {
        let entries = match repr {
            AllowListRepr::Names(names) => names.into_iter().map(|n| (n, Leaves::Any)).collect(),
            AllowListRepr::Map(map) => map
                .into_iter()
                .map(|(name, leaves)| {
                    let leaves = match leaves {
                        LeavesRepr::Single(field) if field == "*" => Leaves::Any,
                        LeavesRepr::Single(field) => Leaves::Only(BTreeSet::from([field])),
                        LeavesRepr::Fields(fields) => Leaves::Only(fields.into_iter().collect()),
                    };
                    (name, leaves)
                })
                .collect(),
        };
        Self { entries }
    }
}

impl AllowList {
    /// Create an empty allow-list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Permit a name with any leaf.
    pub fn allow(&mut self, name: impl Into<String>) {
        self.entries.insert(name.into(), Leaves::Any);
    }

    /// Permit a name with only the given leaves.
    pub fn allow_leaves<I, S>(&mut self, name: impl Into<String>, leaves: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let leaves = leaves.into_iter().map(Into::into).collect();
        self.entries.insert(name.into(), Leaves::Only(leaves));
    }

    /// Check if a field or relation name is listed.
    pub fn allows(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Check if `leaf` is permitted behind the listed `name`.
    pub fn allows_leaf(&self, name: &str, leaf: &str) -> bool {
        self.entries.get(name).is_some_and(|leaves| leaves.permits(leaf))
    }

    /// Leaves entry for a name.
    pub fn get(&self, name: &str) -> Option<&Leaves> {
        self.entries.get(name)
    }

    /// Listed names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Check if nothing is listed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A data-driven entity definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityDef {
    /// Entity name (unique within the registry).
    pub name: String,
    /// Table name.
    pub table: String,
    /// Search opt-in.
    #[serde(default, rename = "is_searchable")]
    pub opt_in: bool,
    /// Fields and relations permitted in order paths.
    #[serde(default, rename = "searchable")]
    pub allow: AllowList,
    /// Fields that must never be filtered on through a relation.
    #[serde(default)]
    pub hidden: BTreeSet<String>,
    /// Relations declared by this entity.
    #[serde(default)]
    pub relations: Vec<RelationDef>,
}

impl EntityDef {
    /// Create a new entity definition.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            opt_in: false,
            allow: AllowList::new(),
            hidden: BTreeSet::new(),
            relations: Vec::new(),
        }
    }

    /// Opt the entity into search.
    pub fn searchable_entity(mut self) -> Self {
        self.opt_in = true;
        self
    }

    /// Allow-list a field or relation with any leaf.
    pub fn allow(mut self, name: impl Into<String>) -> Self {
        self.allow.allow(name);
        self
    }

    /// Allow-list a relation restricted to the given leaves.
    pub fn allow_leaves<I, S>(mut self, name: impl Into<String>, leaves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow.allow_leaves(name, leaves);
        self
    }

    /// Hide a field from relation filters.
    pub fn hide(mut self, field: impl Into<String>) -> Self {
        self.hidden.insert(field.into());
        self
    }

    /// Declare a relation.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }
}

impl SearchableEntity for EntityDef {
    fn name(&self) -> &str {
        &self.name
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn is_searchable(&self) -> bool {
        self.opt_in
    }

    fn allow_list(&self) -> &AllowList {
        &self.allow
    }

    fn is_hidden(&self, field: &str) -> bool {
        self.hidden.contains(field)
    }

    fn relations(&self) -> &[RelationDef] {
        &self.relations
    }
}

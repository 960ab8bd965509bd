//! Relation definitions between entities.

use crate::error::{Error, Result};
use crate::query::{ColumnRef, Condition, JoinKind, Operator, Predicate, SelectQuery, TableSource};
use crate::value::Value;
use serde::Deserialize;

/// Kind of a relation, seen from the entity that declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// To-one; the foreign key lives on the declaring entity.
    BelongsTo,
    /// To-one; the foreign key lives on the related entity.
    HasOne,
    /// To-many; the foreign key lives on the related entity.
    HasMany,
    /// Many-to-many through a pivot table.
    BelongsToMany,
}

impl RelationKind {
    /// Check if at most one related row exists per parent row.
    pub fn is_to_one(&self) -> bool {
        matches!(self, RelationKind::BelongsTo | RelationKind::HasOne)
    }

    /// Check if this is a many-to-many relation.
    pub fn is_many_to_many(&self) -> bool {
        matches!(self, RelationKind::BelongsToMany)
    }
}

/// Pivot table of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Pivot {
    /// Pivot table name.
    pub table: String,
    /// Pivot column pointing at the related entity.
    pub related_pivot_key: String,
    /// Related entity column the pivot points at.
    #[serde(default = "default_key")]
    pub related_key: String,
}

/// An extra condition a relation always applies to its related rows.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelationConstraint {
    /// Column on the related table.
    pub column: String,
    /// Comparison operator.
    #[serde(rename = "where")]
    pub operator: Operator,
    /// Right-hand value.
    pub value: Value,
}

fn default_key() -> String {
    "id".to_string()
}

/// A relation definition.
///
/// Key semantics depend on the kind:
///
/// | kind              | `foreign_key` lives on | `owner_key` lives on |
/// |-------------------|------------------------|----------------------|
/// | `belongs_to`      | declaring entity       | related entity       |
/// | `has_one/has_many`| related entity         | declaring entity     |
/// | `belongs_to_many` | pivot (to declaring)   | declaring entity     |
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelationDef {
    /// Relation name, used as a path segment.
    pub name: String,
    /// Relation kind.
    pub kind: RelationKind,
    /// Related entity name.
    pub related: String,
    /// Foreign key column.
    pub foreign_key: String,
    /// Key column the foreign key points at.
    #[serde(default = "default_key")]
    pub owner_key: String,
    /// Pivot for many-to-many relations.
    #[serde(default)]
    pub pivot: Option<Pivot>,
    /// Whether the relation may be traversed by filters. Defaults to true.
    #[serde(default)]
    pub searchable: Option<bool>,
    /// Conditions always applied to related rows.
    #[serde(default)]
    pub constraints: Vec<RelationConstraint>,
}

impl RelationDef {
    fn new(
        name: impl Into<String>,
        kind: RelationKind,
        related: impl Into<String>,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            related: related.into(),
            foreign_key: foreign_key.into(),
            owner_key: owner_key.into(),
            pivot: None,
            searchable: None,
            constraints: Vec::new(),
        }
    }

    /// Create a belongs-to relation (`parent.foreign_key = related.owner_key`).
    pub fn belongs_to(
        name: impl Into<String>,
        related: impl Into<String>,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        Self::new(name, RelationKind::BelongsTo, related, foreign_key, owner_key)
    }

    /// Create a has-one relation (`parent.owner_key = related.foreign_key`).
    pub fn has_one(
        name: impl Into<String>,
        related: impl Into<String>,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        Self::new(name, RelationKind::HasOne, related, foreign_key, owner_key)
    }

    /// Create a has-many relation (`parent.owner_key = related.foreign_key`).
    pub fn has_many(
        name: impl Into<String>,
        related: impl Into<String>,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        Self::new(name, RelationKind::HasMany, related, foreign_key, owner_key)
    }

    /// Create a many-to-many relation through `pivot_table`.
    pub fn belongs_to_many(
        name: impl Into<String>,
        related: impl Into<String>,
        pivot_table: impl Into<String>,
        foreign_pivot_key: impl Into<String>,
        related_pivot_key: impl Into<String>,
    ) -> Self {
        let mut rel = Self::new(
            name,
            RelationKind::BelongsToMany,
            related,
            foreign_pivot_key,
            default_key(),
        );
        rel.pivot = Some(Pivot {
            table: pivot_table.into(),
            related_pivot_key: related_pivot_key.into(),
            related_key: default_key(),
        });
        rel
    }

    /// Mark the relation as (not) traversable by filters.
    pub fn with_searchable(mut self, searchable: bool) -> Self {
        self.searchable = Some(searchable);
        self
    }

    /// Add a condition applied to every related row.
    pub fn with_constraint(
        mut self,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        self.constraints.push(RelationConstraint {
            column: column.into(),
            operator,
            value: value.into(),
        });
        self
    }

    /// Whether filters may traverse this relation.
    pub fn is_searchable(&self) -> bool {
        self.searchable.unwrap_or(true)
    }

    fn pivot(&self) -> Result<&Pivot> {
        self.pivot.as_ref().ok_or_else(|| {
            Error::Config(format!("many-to-many relation `{}` has no pivot", self.name))
        })
    }

    /// Existence sub-query for this relation, built on canonical table names.
    ///
    /// Parent-side columns are [`ColumnRef::outer`] on `parent_table`; related
    /// and pivot columns are [`ColumnRef::named`]. Callers alias the result
    /// and re-point it with a [`crate::query::PredicateRewriter`].
    pub fn existence_query(&self, parent_table: &str, related_table: &str) -> Result<SelectQuery> {
        let mut query = SelectQuery::from_table(related_table);

        match self.kind {
            RelationKind::BelongsTo => {
                query.and_where(Predicate::columns_eq(
                    ColumnRef::outer(parent_table, &self.foreign_key),
                    ColumnRef::named(related_table, &self.owner_key),
                ));
            }
            RelationKind::HasOne | RelationKind::HasMany => {
                query.and_where(Predicate::columns_eq(
                    ColumnRef::outer(parent_table, &self.owner_key),
                    ColumnRef::named(related_table, &self.foreign_key),
                ));
            }
            RelationKind::BelongsToMany => {
                let pivot = self.pivot()?;
                query.join(
                    JoinKind::Inner,
                    TableSource::new(&pivot.table),
                    vec![Condition::and(Predicate::columns_eq(
                        ColumnRef::named(related_table, &pivot.related_key),
                        ColumnRef::named(&pivot.table, &pivot.related_pivot_key),
                    ))],
                );
                query.and_where(Predicate::columns_eq(
                    ColumnRef::outer(parent_table, &self.owner_key),
                    ColumnRef::named(&pivot.table, &self.foreign_key),
                ));
            }
        }

        for constraint in &self.constraints {
            query.and_where(Predicate::for_operator(
                ColumnRef::named(related_table, &constraint.column),
                constraint.operator,
                constraint.value.clone(),
            ));
        }

        Ok(query)
    }

    /// `ON` conditions joining the related table, aliased as `alias`, to
    /// the parent referred to as `parent`.
    ///
    /// Many-to-many relations would need two joins and are rejected.
    pub fn join_conditions(&self, parent: &str, alias: &str) -> Result<Vec<Condition>> {
        let key = match self.kind {
            RelationKind::BelongsTo => Predicate::columns_eq(
                ColumnRef::named(alias, &self.owner_key),
                ColumnRef::named(parent, &self.foreign_key),
            ),
            RelationKind::HasOne | RelationKind::HasMany => Predicate::columns_eq(
                ColumnRef::named(parent, &self.owner_key),
                ColumnRef::named(alias, &self.foreign_key),
            ),
            RelationKind::BelongsToMany => {
                return Err(Error::UnsupportedRelation {
                    relation: self.name.clone(),
                    kind: self.kind,
                })
            }
        };

        let mut on = vec![Condition::and(key)];
        on.extend(self.constraints.iter().map(|c| {
            Condition::and(Predicate::for_operator(
                ColumnRef::named(alias, &c.column),
                c.operator,
                c.value.clone(),
            ))
        }));
        Ok(on)
    }
}

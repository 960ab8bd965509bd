//! Order-mode relation walk: dotted order paths become a `left join` chain.

use super::compiler::CompileContext;
use super::request::OrderSpec;
use crate::catalog::SearchableEntity;
use crate::error::{Error, Result};
use crate::query::{ColumnRef, SelectQuery, TableSource};
use std::collections::HashMap;
use tracing::debug;

/// Apply `order` to `query`, rooted at `root`.
///
/// A plain field orders on the root table. A relational path joins every
/// hop and orders on the alias of the last joined table. Hidden fields are
/// never ordered by, whatever the hidden-field policy.
pub(crate) fn apply(
    ctx: &mut CompileContext<'_>,
    query: &mut SelectQuery,
    root: &dyn SearchableEntity,
    order: &OrderSpec,
) -> Result<()> {
    if !order.is_relational() {
        if root.is_hidden(&order.field) {
            return Err(Error::permission_denied(root.name(), order.field.as_str()));
        }
        query.order_by(ColumnRef::named(root.table(), &order.field), order.direction);
        return Ok(());
    }

    let qualifier = resolve_joins(ctx, query, root, &order.relations, &order.field)?;
    query.order_by(ColumnRef::named(qualifier, &order.field), order.direction);
    Ok(())
}

/// Left-join every relation in `relations`, returning the alias of the
/// final joined table.
///
/// Every hop must be on the current entity's allow-list, and the last hop's
/// leaf restriction (if any) must admit `field`, which must not be hidden on
/// the final entity. Joined tables are tracked
/// by canonical name so a hop starting from an already joined table uses
/// that table's most recent alias.
pub(crate) fn resolve_joins(
    ctx: &mut CompileContext<'_>,
    query: &mut SelectQuery,
    root: &dyn SearchableEntity,
    relations: &[String],
    field: &str,
) -> Result<String> {
    let registry = ctx.registry;
    let mut prior_joins: HashMap<String, String> = HashMap::new();
    let mut current = root;

    for (i, name) in relations.iter().enumerate() {
        let allow = current.allow_list();
        if !allow.allows(name) {
            return Err(Error::permission_denied(current.name(), name.as_str()));
        }
        if i + 1 == relations.len() && !allow.allows_leaf(name, field) {
            return Err(Error::permission_denied(
                current.name(),
                format!("{}.{}", name, field),
            ));
        }

        let relation = current
            .relation(name)
            .ok_or_else(|| Error::unknown_relation(current.name(), name.as_str()))?;
        let related = registry
            .entity(&relation.related)
            .ok_or_else(|| Error::UnknownEntity(relation.related.clone()))?;
        if i + 1 == relations.len() && related.is_hidden(field) {
            return Err(Error::permission_denied(related.name(), field));
        }

        let parent = prior_joins
            .get(current.table())
            .cloned()
            .unwrap_or_else(|| current.table().to_string());
        let alias = ctx.joins.allocate();
        let on = relation.join_conditions(&parent, &alias)?;

        debug!(
            entity = current.name(),
            relation = name.as_str(),
            table = related.table(),
            alias = %alias,
            "Order join"
        );

        query.left_join(TableSource::aliased(related.table(), &alias), on);
        prior_joins.insert(related.table().to_string(), alias);
        current = related;
    }

    Ok(prior_joins
        .get(current.table())
        .cloned()
        .unwrap_or_else(|| current.table().to_string()))
}

//! Filter-mode relation walk: dotted paths become nested `exists` sub-queries.

use super::compiler::CompileContext;
use crate::catalog::{Registry, SearchableEntity};
use crate::config::HiddenFieldPolicy;
use crate::error::{Error, Result};
use crate::query::{Boolean, ColumnRef, Operator, Predicate, PredicateRewriter, SelectQuery};
use crate::value::Value;
use tracing::{debug, warn};

/// Leaf of a relational criterion.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Leaf<'a> {
    pub field: &'a str,
    pub operator: Operator,
    pub value: &'a Value,
}

/// Where a hop starts: the entity and the name its table goes by in the
/// enclosing query (its table name at the root, its alias further down).
#[derive(Clone, Copy)]
pub(crate) struct Hop<'a> {
    pub entity: &'a dyn SearchableEntity,
    pub qualifier: &'a str,
}

/// Attach one `exists` level per relation in `path` to `query`.
///
/// The outermost level is combined with `boolean`; nested levels are always
/// `and`. A relation that is not searchable stops the walk there and leaves
/// `query` as it was.
pub(crate) fn walk(
    ctx: &mut CompileContext<'_>,
    query: &mut SelectQuery,
    from: Hop<'_>,
    path: &[&str],
    leaf: Leaf<'_>,
    boolean: Boolean,
) -> Result<()> {
    let Some((name, rest)) = path.split_first() else {
        return Ok(());
    };

    let parent = from.entity;
    let relation = parent
        .relation(name)
        .ok_or_else(|| Error::unknown_relation(parent.name(), *name))?;

    if !relation.is_searchable() {
        warn!(
            entity = parent.name(),
            relation = *name,
            "Relation is not searchable, skipping criterion"
        );
        return Ok(());
    }

    let related = lookup(ctx.registry, &relation.related)?;
    let mut sub = relation.existence_query(parent.table(), related.table())?;

    let alias = ctx.exists.allocate();
    sub.alias_from(&alias);
    PredicateRewriter::new(related.table(), &alias)
        .with_prior(parent.table(), from.qualifier)
        .apply(&mut sub);

    debug!(
        entity = parent.name(),
        relation = *name,
        table = related.table(),
        alias = %alias,
        "Relation hop"
    );

    if rest.is_empty() {
        if related.is_hidden(leaf.field) {
            match ctx.hidden_field_policy {
                HiddenFieldPolicy::Drop => {
                    warn!(
                        entity = related.name(),
                        field = leaf.field,
                        "Hidden field in filter, predicate dropped"
                    );
                }
                HiddenFieldPolicy::Deny => {
                    return Err(Error::permission_denied(related.name(), leaf.field));
                }
            }
        } else {
            sub.and_where(Predicate::for_operator(
                ColumnRef::named(&alias, leaf.field),
                leaf.operator,
                leaf.value.clone(),
            ));
        }
    } else {
        let next = Hop {
            entity: related,
            qualifier: &alias,
        };
        walk(ctx, &mut sub, next, rest, leaf, Boolean::And)?;
    }

    query.push_where(boolean, Predicate::Exists(Box::new(sub)));
    Ok(())
}

fn lookup<'r>(registry: &'r Registry, name: &str) -> Result<&'r dyn SearchableEntity> {
    registry
        .entity(name)
        .ok_or_else(|| Error::UnknownEntity(name.to_string()))
}

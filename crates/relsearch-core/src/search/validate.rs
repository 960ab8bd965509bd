//! Request shape validation.

use super::request::SearchRequest;
use crate::catalog::Registry;
use crate::error::ErrorBag;
use crate::query::{is_plain_identifier, Operator};
use std::collections::BTreeSet;

/// Validation rules derived from a registry.
///
/// Checks the shape of a request before anything is compiled: every item
/// names a known entity, and every criterion carries a field made of plain
/// identifiers, a known operator and a value. Messages are keyed by request path
/// (`0.entity`, `0.criteria.2.where`).
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    entities: BTreeSet<String>,
}

impl RuleSet {
    /// Build rules accepting the registry's search keys.
    pub fn from_registry(registry: &Registry) -> Self {
        Self {
            entities: registry.list_entities().into_iter().map(str::to_string).collect(),
        }
    }

    /// Validate a request, collecting every problem.
    pub fn validate(&self, request: &SearchRequest) -> Result<(), ErrorBag> {
        let mut errors = ErrorBag::new();

        for (i, item) in request.items.iter().enumerate() {
            match item.entity.as_deref().map(str::trim) {
                None | Some("") => {
                    errors.add(format!("{}.entity", i), format!("Entity at #{} Must be present", i))
                }
                Some(key) if !self.entities.contains(key) => errors.add(
                    format!("{}.entity", i),
                    format!("Entity at #{} is not a valid entity reference", i),
                ),
                Some(_) => {}
            }

            for (j, criterion) in item.criteria().iter().enumerate() {
                let key = |part: &str| format!("{}.criteria.{}.{}", i, j, part);
                let missing = |part: &str| {
                    format!("Criteria List at #{} is missing a requirement: {}", i, part)
                };

                if criterion.field.as_deref().map_or(true, |f| f.trim().is_empty()) {
                    errors.add(key("field"), missing("field"));
                } else if criterion.path().is_some_and(|(relations, leaf)| {
                    !is_plain_identifier(leaf) || !relations.iter().all(|r| is_plain_identifier(r))
                }) {
                    errors.add(
                        key("field"),
                        format!("Criteria List at #{} has an invalid field path", i),
                    );
                }

                match criterion.operator.as_deref() {
                    None => errors.add(key("where"), missing("where")),
                    Some(op) if op.trim().is_empty() => errors.add(key("where"), missing("where")),
                    Some(op) if Operator::parse(op).is_none() => errors.add(
                        key("where"),
                        format!("Criteria List at #{} has an unsupported operator: {}", i, op),
                    ),
                    Some(_) => {}
                }

                if criterion.value.is_none() {
                    errors.add(key("value"), missing("value"));
                }
            }
        }

        errors.into_result()
    }
}

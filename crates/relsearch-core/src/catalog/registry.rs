//! Entity registry: definitions plus the keys exposed to search requests.

use super::entity::SearchableEntity;
use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Read-only catalog of entities, built once at startup and shared.
///
/// Every entity a relation may point at is registered by name. Only the
/// entities listed in `search_models` can be the root of a search, under
/// their short key (`"user" -> "User"`).
#[derive(Debug, Default, Clone)]
pub struct Registry {
    entities: HashMap<String, Arc<dyn SearchableEntity>>,
    search_models: BTreeMap<String, String>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity definition.
    pub fn with_entity(mut self, entity: impl SearchableEntity + 'static) -> Self {
        self.register(Arc::new(entity));
        self
    }

    /// Expose a registered entity under a search key.
    pub fn expose(mut self, key: impl Into<String>, entity: impl Into<String>) -> Self {
        self.search_models.insert(key.into(), entity.into());
        self
    }

    /// Register a shared entity definition, replacing one with the same name.
    pub fn register(&mut self, entity: Arc<dyn SearchableEntity>) -> Option<Arc<dyn SearchableEntity>> {
        self.entities.insert(entity.name().to_string(), entity)
    }

    /// Resolve a search key to its entity.
    pub fn resolve(&self, key: &str) -> Option<&dyn SearchableEntity> {
        self.search_models
            .get(key)
            .and_then(|name| self.entity(name))
    }

    /// Look up an entity by name.
    pub fn entity(&self, name: &str) -> Option<&dyn SearchableEntity> {
        self.entities.get(name).map(|e| e.as_ref())
    }

    /// Check if a search key is exposed.
    pub fn contains_key(&self, key: &str) -> bool {
        self.search_models.contains_key(key)
    }

    /// Exposed search keys, sorted.
    pub fn list_entities(&self) -> Vec<&str> {
        self.search_models.keys().map(String::as_str).collect()
    }

    /// Number of registered entity definitions.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Check internal consistency.
    ///
    /// Every exposed key must name a registered entity, every relation must
    /// point at a registered entity, and many-to-many relations need a pivot.
    pub fn validate(&self) -> Result<()> {
        for (key, name) in &self.search_models {
            if !self.entities.contains_key(name) {
                return Err(Error::Config(format!(
                    "search key `{}` points at unknown entity `{}`",
                    key, name
                )));
            }
        }

        for entity in self.entities.values() {
            for relation in entity.relations() {
                if !self.entities.contains_key(&relation.related) {
                    return Err(Error::Config(format!(
                        "relation `{}.{}` points at unknown entity `{}`",
                        entity.name(),
                        relation.name,
                        relation.related
                    )));
                }
                if relation.kind.is_many_to_many() && relation.pivot.is_none() {
                    return Err(Error::Config(format!(
                        "many-to-many relation `{}.{}` has no pivot",
                        entity.name(),
                        relation.name
                    )));
                }
            }
        }

        Ok(())
    }
}

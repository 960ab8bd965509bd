//! Search configuration loaded from JSON.

use crate::catalog::{EntityDef, Registry};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// What to do when a filter reaches a hidden field through a relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HiddenFieldPolicy {
    /// Drop the predicate and carry on.
    #[default]
    Drop,
    /// Fail the request with a permission error.
    Deny,
}

/// Search configuration.
///
/// ```json
/// {
///   "search_models": { "user": "User" },
///   "entities": [
///     { "name": "User", "table": "users", "is_searchable": true,
///       "searchable": ["posts"],
///       "relations": [
///         { "name": "posts", "kind": "has_many", "related": "Post", "foreign_key": "user_id" }
///       ] },
///     { "name": "Post", "table": "posts" }
///   ],
///   "hidden_field_policy": "drop"
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchConfig {
    /// Search key to entity name.
    #[serde(default)]
    pub search_models: BTreeMap<String, String>,
    /// Every entity a search or relation may reach.
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    /// Hidden field handling.
    #[serde(default)]
    pub hidden_field_policy: HiddenFieldPolicy,
}

impl SearchConfig {
    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    /// Build and validate the registry described by this configuration.
    pub fn build_registry(&self) -> Result<Registry> {
        let mut registry = Registry::new();
        let mut seen = HashSet::new();

        for entity in &self.entities {
            if !seen.insert(entity.name.as_str()) {
                return Err(Error::Config(format!(
                    "entity `{}` is defined more than once",
                    entity.name
                )));
            }
            registry.register(Arc::new(entity.clone()));
        }

        for (key, name) in &self.search_models {
            registry = registry.expose(key, name);
        }

        registry.validate()?;
        Ok(registry)
    }
}

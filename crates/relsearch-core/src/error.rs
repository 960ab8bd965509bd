//! Core error types.

use crate::catalog::RelationKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Search compilation errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The request contained no search items.
    #[error("no search parameters set")]
    EmptyInput,

    /// The request failed shape validation.
    #[error("validation failed: {0}")]
    Validation(ErrorBag),

    /// Entity key or entity name is not registered.
    #[error("entity `{0}` does not exist")]
    UnknownEntity(String),

    /// Entity is registered but has not opted into search.
    #[error("entity `{0}` is not searchable")]
    EntityNotSearchable(String),

    /// A field or relation outside the entity's allow-list was used.
    #[error("permission denied: `{field}` is not searchable on `{entity}`")]
    PermissionDenied {
        /// Entity the lookup happened on.
        entity: String,
        /// Field or relation name.
        field: String,
    },

    /// A criterion is missing its field or operator.
    #[error("criterion #{criterion} of search item #{item} is missing a field or operator")]
    MalformedCriterion {
        /// Index of the search item.
        item: usize,
        /// Index of the criterion within the item.
        criterion: usize,
    },

    /// A path segment does not name a relation on the current entity.
    #[error("unknown relation `{relation}` on entity `{entity}`")]
    UnknownRelation {
        /// Entity the relation was looked up on.
        entity: String,
        /// Relation name.
        relation: String,
    },

    /// Relation kind cannot be used where it was requested.
    #[error("relation `{relation}` ({kind:?}) cannot be joined for ordering")]
    UnsupportedRelation {
        /// Relation name.
        relation: String,
        /// Relation kind.
        kind: RelationKind,
    },

    /// Invalid search configuration or registry contents.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error while loading configuration.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading configuration.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Client-facing classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request shape is wrong.
    Validation,
    /// Request touches something outside the allow-list (401 semantic).
    PermissionDenied,
    /// Nothing to search, or the entity does not exist.
    NotFound,
    /// Server-side misconfiguration.
    Internal,
}

impl Error {
    /// Classify this error for transport mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyInput | Error::UnknownEntity(_) => ErrorKind::NotFound,
            Error::Validation(_)
            | Error::MalformedCriterion { .. }
            | Error::UnknownRelation { .. }
            | Error::UnsupportedRelation { .. } => ErrorKind::Validation,
            Error::EntityNotSearchable(_) | Error::PermissionDenied { .. } => {
                ErrorKind::PermissionDenied
            }
            Error::Config(_) | Error::Io(_) | Error::Serde(_) => ErrorKind::Internal,
        }
    }

    /// Create a permission denied error.
    pub fn permission_denied(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Error::PermissionDenied {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create an unknown relation error.
    pub fn unknown_relation(entity: impl Into<String>, relation: impl Into<String>) -> Self {
        Error::UnknownRelation {
            entity: entity.into(),
            relation: relation.into(),
        }
    }
}

/// Result type for search operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation messages keyed by request path (`0.entity`, `1.criteria.0.where`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorBag {
    messages: BTreeMap<String, Vec<String>>,
}

impl ErrorBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message under a key.
    pub fn add(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.messages.entry(key.into()).or_default().push(message.into());
    }

    /// Check if no messages were recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of keys with at least one message.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if a key has messages.
    pub fn has(&self, key: &str) -> bool {
        self.messages.contains_key(key)
    }

    /// Messages recorded for a key.
    pub fn get(&self, key: &str) -> &[String] {
        self.messages.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All keys, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    /// All messages, flattened.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.messages.values().flatten().map(String::as_str)
    }

    /// Convert into `Ok(())` when empty, `Err(self)` otherwise.
    pub fn into_result(self) -> std::result::Result<(), ErrorBag> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ErrorBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let all: Vec<&str> = self.all().collect();
        f.write_str(&all.join("; "))
    }
}

//! JSON request and response types for the HTTP gateway.

use relsearch_core::{SearchRequest, Sql, Value};
use serde::{Deserialize, Serialize};

/// Generic success response wrapper.
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    /// Success flag.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    /// Create a new success response.
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status.
    pub status: String,
    /// Gateway version.
    pub version: String,
    /// Number of exposed search keys.
    pub entities: usize,
    /// Address the gateway listens on.
    pub listen_addr: String,
}

/// Search request body.
#[derive(Debug, Deserialize)]
pub struct SearchBody {
    /// Search items.
    #[serde(default)]
    pub search: SearchRequest,
    /// Dotted order path.
    #[serde(default)]
    pub order_by: Option<String>,
    /// Order direction (`asc` / `desc`).
    #[serde(default)]
    pub order_as: Option<String>,
}

/// Compiled search.
#[derive(Debug, Serialize)]
pub struct CompiledSearch {
    /// Search key of the item the query was compiled for.
    pub entity: String,
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Bind values in placeholder order.
    pub bindings: Vec<Value>,
}

impl CompiledSearch {
    /// Wrap rendered SQL for an entity key.
    pub fn new(entity: impl Into<String>, sql: Sql) -> Self {
        Self {
            entity: entity.into(),
            sql: sql.text,
            bindings: sql.bindings,
        }
    }
}

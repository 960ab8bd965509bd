//! Search endpoint.

use axum::body::Bytes;
use axum::{extract::State, routing::post, Json, Router};
use tracing::debug;

use crate::error::AppError;
use crate::json::{CompiledSearch, SearchBody, SuccessResponse};
use crate::AppState;

/// Search routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/search", post(handle_search))
}

/// Compile a search request.
///
/// Only the last item's query is returned; earlier items are still compiled
/// so any error among them fails the request.
async fn handle_search(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse<CompiledSearch>>, AppError> {
    let body: SearchBody = serde_json::from_slice(&body)?;

    let query = state.searcher.compile_with(
        &body.search,
        body.order_by.as_deref(),
        body.order_as.as_deref(),
    )?;

    let entity = body
        .search
        .items
        .last()
        .and_then(|item| item.entity.clone())
        .unwrap_or_default();
    let sql = query.to_sql();
    debug!(entity = %entity, bindings = sql.bindings.len(), "Compiled search");

    Ok(Json(SuccessResponse::new(CompiledSearch::new(entity, sql))))
}

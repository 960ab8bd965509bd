//! Entity listing endpoint.

use axum::{extract::State, routing::get, Json, Router};

use crate::json::SuccessResponse;
use crate::AppState;

/// Schema routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/entities", get(handle_list_entities))
}

/// List the search keys clients may use as `entity`.
async fn handle_list_entities(State(state): State<AppState>) -> Json<SuccessResponse<Vec<String>>> {
    let entities = state
        .searcher
        .list_entities()
        .into_iter()
        .map(str::to_string)
        .collect();
    Json(SuccessResponse::new(entities))
}

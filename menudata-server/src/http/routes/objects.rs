//! Objects endpoint - filtered rows from the configured table

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::{middleware, routing::get, Json, Router};
use menudata_core::FilterSet;

use crate::db::Record;
use crate::http::auth::require_api_key;
use crate::http::error::ApiError;
use crate::state::AppState;

/// GET /api/objects - rows matching the optional date/meal_time/line_type filters
///
/// The query string is taken as raw pairs so a repeated key keeps its first
/// value instead of failing to deserialize.
async fn list_objects(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Record>>, ApiError> {
    // No pool: fail before building or running anything
    let source = state.database.current().ok_or(ApiError::Unavailable)?;

    let filters = FilterSet::from_pairs(params);
    let statement = state.queries.build(&filters);
    tracing::debug!(
        sql = statement.sql(),
        bindings = statement.bindings().len(),
        "executing objects query"
    );

    let records = source.fetch(&statement).await?;
    tracing::debug!(rows = records.len(), "objects query complete");

    Ok(Json(records))
}

/// Objects routes, wrapped in the API key gate
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/objects", get(list_objects))
        .route_layer(middleware::from_fn_with_state(state, require_api_key))
}

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use crate::AppState;
use crate::api::error::AppError;

#[derive(Deserialize, IntoParams)]
pub struct SearchParams {
    /// Free-text query, 1 to 200 characters
    #[serde(default)]
    pub q: String,
}

#[utoipa::path(
    get,
    path = "/api/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Provider response, passed through unchanged"),
        (status = 400, description = "Empty or oversized query"),
        (status = 502, description = "Provider failed"),
        (status = 503, description = "Search not configured")
    ),
    tag = "search"
)]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, AppError> {
    let results = state.search.search(&params.q).await?;
    Ok(Json(results))
}

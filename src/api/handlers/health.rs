use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use crate::AppState;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
    pub published: bool,
    pub search: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage_status = match tokio::fs::metadata(state.storage.root()).await {
        Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => "writable",
        Ok(_) => "readonly",
        Err(_) => "unavailable",
    };

    let search_status = if state.search.is_configured() {
        "configured"
    } else {
        "disabled"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        storage: storage_status.to_string(),
        published: state.upload_service.current().await.is_some(),
        search: search_status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

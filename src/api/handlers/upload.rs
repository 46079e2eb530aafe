use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;
use crate::api::error::AppError;
use crate::models::UploadCandidate;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Root-relative URL of the published file
    pub file_path: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentFileResponse {
    pub file_path: String,
    pub size: u64,
    pub published_at: DateTime<Utc>,
    pub duration_secs: u64,
}

/// Multipart body accepted by `/api/upload`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub audio: Vec<u8>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File accepted and published", body = UploadResponse),
        (status = 400, description = "Wrong type, bad name, bad signature or unparseable audio"),
        (status = 413, description = "File too large"),
        (status = 500, description = "Storage failure")
    ),
    tag = "upload"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let field_name = state.config.field_name.as_str();

    let result: Result<Json<UploadResponse>, AppError> = async {
        let mut candidate: Option<UploadCandidate> = None;

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            if field.name() != Some(field_name) {
                continue;
            }
            if candidate.is_some() {
                return Err(AppError::BadRequest(
                    "Only one file may be uploaded at a time".to_string(),
                ));
            }

            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?;

            candidate = Some(UploadCandidate::new(bytes, content_type, file_name));
        }

        let candidate = candidate.ok_or(AppError::BadRequest("No file provided".to_string()))?;
        let published = state.upload_service.process(candidate).await?;

        Ok(Json(UploadResponse {
            file_path: published.public_path,
        }))
    }
    .await;

    match result {
        Ok(res) => Ok(res),
        Err(e) => {
            // Drain what the client is still sending so it sees the error instead of a reset.
            tracing::warn!("Upload rejected: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/current",
    responses(
        (status = 200, description = "The file currently served", body = CurrentFileResponse),
        (status = 404, description = "Nothing has been published yet")
    ),
    tag = "upload"
)]
pub async fn current_file(
    State(state): State<AppState>,
) -> Result<Json<CurrentFileResponse>, AppError> {
    let current = state
        .upload_service
        .current()
        .await
        .ok_or_else(|| AppError::NotFound("No file has been published yet".to_string()))?;

    Ok(Json(CurrentFileResponse {
        file_path: current.public_path,
        size: current.size,
        published_at: current.published_at,
        duration_secs: current.audio.duration.as_secs(),
    }))
}

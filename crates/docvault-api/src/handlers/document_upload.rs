use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use docvault_core::models::DocumentResponse;
use docvault_core::AppError;
use uuid::Uuid;

use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::UploadRequest;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v0/documents",
    tag = "documents",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Document uploaded", body = DocumentResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "File too large or quota exceeded", body = ErrorResponse),
        (status = 503, description = "Object store unavailable", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    mut multipart: Multipart,
) -> Result<(axum::http::StatusCode, Json<DocumentResponse>), HttpAppError> {
    let mut file: Option<(Vec<u8>, String, String)> = None;
    let mut category_id: Option<Uuid> = None;
    let mut description: Option<String> = None;
    let mut tags: Vec<String> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed multipart body: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::InvalidInput("File part needs a filename".into()))?;
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Failed to read file: {}", e)))?;
                file = Some((data.to_vec(), filename, content_type));
            }
            "category_id" => {
                let raw = read_text_field(field).await?;
                category_id = Some(raw.trim().parse().map_err(|_| {
                    AppError::InvalidInput("category_id must be a UUID".to_string())
                })?);
            }
            "description" => {
                description = Some(read_text_field(field).await?);
            }
            "tags" => {
                let raw = read_text_field(field).await?;
                tags = raw
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    let (data, original_filename, content_type) =
        file.ok_or_else(|| AppError::InvalidInput("Missing 'file' part".to_string()))?;

    let document = state
        .service
        .upload(
            &caller,
            UploadRequest {
                data,
                original_filename,
                content_type,
                category_id,
                description,
                tags,
            },
        )
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(DocumentResponse::from(document)),
    ))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read field: {}", e)))
}

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use docvault_core::models::{DocumentResponse, DocumentUpdate};
use docvault_core::AppError;
use uuid::Uuid;

use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[utoipa::path(
    patch,
    path = "/api/v0/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document id")),
    request_body = DocumentUpdate,
    responses(
        (status = 200, description = "Updated document", body = DocumentResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_document(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(id): Path<Uuid>,
    Json(update): Json<DocumentUpdate>,
) -> Result<Json<DocumentResponse>, HttpAppError> {
    if update.is_empty() {
        return Err(AppError::InvalidInput("No fields to update".to_string()).into());
    }
    let document = state.service.update(&caller, id, update).await?;
    Ok(Json(DocumentResponse::from(document)))
}

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[utoipa::path(
    delete,
    path = "/api/v0/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse),
        (status = 503, description = "Object store unavailable", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    state.service.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

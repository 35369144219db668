use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use docvault_core::models::{AccessGrant, Disposition};
use docvault_core::AppError;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    /// 'attachment' (default) or 'inline'.
    pub disposition: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v0/documents/{id}/access-url",
    tag = "documents",
    params(
        ("id" = Uuid, Path, description = "Document id"),
        ("disposition" = Option<String>, Query, description = "'attachment' (default) or 'inline'")
    ),
    responses(
        (status = 200, description = "Short-lived signed URL", body = AccessGrant),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Document or its content is gone", body = ErrorResponse),
        (status = 503, description = "Object store unavailable", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn access_url(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(id): Path<Uuid>,
    Query(query): Query<AccessQuery>,
) -> Result<Json<AccessGrant>, HttpAppError> {
    let disposition = match query.disposition.as_deref() {
        None => Disposition::Attachment,
        Some(raw) => raw.parse().map_err(AppError::InvalidInput)?,
    };
    let grant = state.service.access_url(&caller, id, disposition).await?;
    Ok(Json(grant))
}

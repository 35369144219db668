use std::sync::Arc;

use axum::{extract::State, Json};
use docvault_core::models::QuotaSnapshot;

use crate::auth::CallerContext;
use crate::error::HttpAppError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v0/quota",
    tag = "quota",
    responses(
        (status = 200, description = "Caller's current storage usage", body = QuotaSnapshot)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_quota(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
) -> Result<Json<QuotaSnapshot>, HttpAppError> {
    let snapshot = state.quota.snapshot(caller.user_id).await?;
    Ok(Json(snapshot))
}

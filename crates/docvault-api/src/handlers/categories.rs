use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use docvault_core::models::{CategoryResponse, CreateCategory};
use docvault_core::AppError;
use uuid::Uuid;

use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

fn require_admin(caller: &CallerContext) -> Result<(), AppError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Category management is admin-only".to_string(),
        ))
    }
}

#[utoipa::path(
    post,
    path = "/api/v0/categories",
    tag = "categories",
    request_body = CreateCategory,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Admin only", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    ValidatedJson(input): ValidatedJson<CreateCategory>,
) -> Result<(StatusCode, Json<CategoryResponse>), HttpAppError> {
    require_admin(&caller)?;
    let category = state.categories.create(input).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

#[utoipa::path(
    get,
    path = "/api/v0/categories",
    tag = "categories",
    responses(
        (status = 200, description = "All categories", body = Vec<CategoryResponse>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    _caller: CallerContext,
) -> Result<Json<Vec<CategoryResponse>>, HttpAppError> {
    let categories = state.categories.list().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v0/categories/{id}",
    tag = "categories",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category", body = CategoryResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    _caller: CallerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<CategoryResponse>, HttpAppError> {
    let category = state
        .categories
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;
    Ok(Json(category.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v0/categories/{id}",
    tag = "categories",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 409, description = "Category still referenced by documents", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    require_admin(&caller)?;
    state.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use docvault_core::models::{
    DocumentFilter, DocumentResponse, DocumentSummary, Page, Pagination, TagMatch,
};
use docvault_core::AppError;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::CallerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category_id: Option<Uuid>,
    pub content_type: Option<String>,
    /// Comma-separated tag list.
    pub tags: Option<String>,
    pub tag_match: Option<TagMatch>,
    /// Ranked free-text search over filename and description.
    pub q: Option<String>,
    pub uploaded_after: Option<DateTime<Utc>>,
    pub uploaded_before: Option<DateTime<Utc>>,
    /// Admin-only; ignored for regular callers.
    pub owner_id: Option<Uuid>,
}

impl ListQuery {
    fn into_filter(self) -> (DocumentFilter, Pagination) {
        let tags = self
            .tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        let filter = DocumentFilter {
            owner_id: self.owner_id,
            category_id: self.category_id,
            content_type: self.content_type,
            tags,
            tag_match: self.tag_match.unwrap_or_default(),
            query: self.q.filter(|q| !q.trim().is_empty()),
            uploaded_after: self.uploaded_after,
            uploaded_before: self.uploaded_before,
        };
        (filter, Pagination::new(self.page, self.limit))
    }
}

#[utoipa::path(
    get,
    path = "/api/v0/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document metadata", body = DocumentResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, HttpAppError> {
    let document = state.service.get(&caller, id).await?;
    Ok(Json(DocumentResponse::from(document)))
}

#[utoipa::path(
    get,
    path = "/api/v0/documents",
    tag = "documents",
    params(
        ("page" = Option<u32>, Query, description = "Page number, 1-based"),
        ("limit" = Option<u32>, Query, description = "Page size, max 100"),
        ("category_id" = Option<Uuid>, Query, description = "Filter by category"),
        ("content_type" = Option<String>, Query, description = "Filter by exact content type"),
        ("tags" = Option<String>, Query, description = "Comma-separated tags"),
        ("tag_match" = Option<String>, Query, description = "'any' (default) or 'all'"),
        ("q" = Option<String>, Query, description = "Free-text search, ranked"),
        ("uploaded_after" = Option<String>, Query, description = "RFC 3339 lower bound"),
        ("uploaded_before" = Option<String>, Query, description = "RFC 3339 upper bound")
    ),
    responses(
        (status = 200, description = "Page of documents", body = Page<DocumentSummary>),
        (status = 400, description = "Invalid query", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<DocumentSummary>>, HttpAppError> {
    if query.owner_id.is_some() && !caller.is_admin() {
        return Err(AppError::Forbidden("owner_id filter is admin-only".to_string()).into());
    }

    let (filter, pagination) = query.into_filter();
    let (documents, total) = state.service.list(&caller, filter, pagination).await?;
    let items = documents.into_iter().map(DocumentSummary::from).collect();
    Ok(Json(Page::new(items, total, pagination)))
}

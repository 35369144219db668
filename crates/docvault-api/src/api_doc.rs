//! OpenAPI documentation.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use docvault_core::models;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Docvault API",
        version = "0.1.0",
        description = "Document storage API (v0). Uploaded files are content-inspected, stored in S3 with per-user quotas, and retrieved through short-lived signed URLs. All endpoints are versioned under /api/v0/."
    ),
    modifiers(&BearerAuth),
    paths(
        // Documents
        handlers::document_upload::upload_document,
        handlers::document_get::get_document,
        handlers::document_get::list_documents,
        handlers::document_update::update_document,
        handlers::document_download::access_url,
        handlers::document_delete::delete_document,
        // Categories
        handlers::categories::create_category,
        handlers::categories::list_categories,
        handlers::categories::get_category,
        handlers::categories::delete_category,
        // Quota
        handlers::quota::get_quota,
    ),
    components(
        schemas(
            models::DocumentResponse,
            models::DocumentSummary,
            models::DocumentUpdate,
            models::CategoryResponse,
            models::CreateCategory,
            models::AccessGrant,
            models::Disposition,
            models::QuotaSnapshot,
            models::SecurityMetadata,
            models::TagMatch,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "documents", description = "Document upload, metadata, and retrieval operations"),
        (name = "categories", description = "Category management"),
        (name = "quota", description = "Per-user storage usage")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

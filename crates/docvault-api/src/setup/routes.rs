//! Route configuration.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use docvault_core::constants::API_PREFIX;
use docvault_core::Config;
use docvault_infra::{request_id_middleware, security_headers_middleware};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthState};
use crate::handlers;
use crate::middleware::{rate_limit_middleware, HttpRateLimiter};
use crate::state::AppState;

/// Multipart framing overhead allowed on top of the configured file cap.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = Arc::new(AuthState::new(config.jwt_secret()));
    let rate_limiter = setup_rate_limiter(config);

    // Rate limiting sits inside the auth layer on protected routes so the
    // caller identity is available for per-user keys; public routes fall
    // back to keying on the remote address.
    let protected = protected_routes()
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ));

    let public = public_routes().layer(axum::middleware::from_fn_with_state(
        rate_limiter,
        rate_limit_middleware,
    ));

    let app = public
        .merge(protected)
        .nest(
            "/docs",
            utoipa_rapidoc::RapiDoc::new("/api/openapi.json")
                .path("/docs")
                .into(),
        )
        .layer(RequestBodyLimitLayer::new(
            config.max_file_size_bytes() as usize + MULTIPART_OVERHEAD_BYTES,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .with_state(state);

    Ok(app)
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::liveness_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
}

fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/documents", API_PREFIX),
            post(handlers::document_upload::upload_document)
                .get(handlers::document_get::list_documents),
        )
        .route(
            &format!("{}/documents/{{id}}", API_PREFIX),
            get(handlers::document_get::get_document)
                .patch(handlers::document_update::update_document)
                .delete(handlers::document_delete::delete_document),
        )
        .route(
            &format!("{}/documents/{{id}}/access-url", API_PREFIX),
            get(handlers::document_download::access_url),
        )
        .route(
            &format!("{}/categories", API_PREFIX),
            post(handlers::categories::create_category).get(handlers::categories::list_categories),
        )
        .route(
            &format!("{}/categories/{{id}}", API_PREFIX),
            get(handlers::categories::get_category).delete(handlers::categories::delete_category),
        )
        .route(
            &format!("{}/quota", API_PREFIX),
            get(handlers::quota::get_quota),
        )
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins().contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins().iter().map(|o| o.parse()).collect();
        CorsLayer::new()
            .allow_origin(origins.unwrap_or_default())
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any)
    };
    Ok(cors)
}

fn setup_rate_limiter(config: &Config) -> Arc<HttpRateLimiter> {
    let rate_limiter = Arc::new(HttpRateLimiter::new(
        config.http_rate_limit_per_minute(),
        config.upload_rate_limit_per_minute(),
    ));

    let rate_limiter_for_cleanup = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter_for_cleanup.cleanup_expired_buckets().await;
        }
    });

    tracing::info!(
        rate_limit_per_minute = config.http_rate_limit_per_minute(),
        upload_rate_limit_per_minute = config.upload_rate_limit_per_minute(),
        "HTTP rate limiting enabled"
    );
    rate_limiter
}

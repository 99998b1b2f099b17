//! # API REST
//!
//! REST API implementation for the media service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - Static serving of the upload root under the public prefix
//! - REST-specific concerns (multipart parsing, JSON serialization, CORS)
//!
//! Uses `api-shared` for response types and `media-core` for all media operations.

#![warn(rust_2018_idioms)]

mod error;
mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use media_core::MediaService;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use handlers::UploadQuery;

/// Multipart overhead allowed on top of the file payload.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Number of maximum-size files a batch request may carry.
const MAX_BATCH_FILES: usize = 10;

/// Application state for the REST API server
#[derive(Clone)]
pub struct AppState {
    service: Arc<MediaService>,
}

impl AppState {
    pub fn new(service: Arc<MediaService>) -> Self {
        Self { service }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::upload,
        handlers::upload_batch,
        handlers::asset_info,
        handlers::delete_asset,
        handlers::storage_stats,
        handlers::validate_references,
        handlers::cleanup_orphans,
        handlers::fix_broken_references,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::UploadRes,
        api_shared::FailedUploadRes,
        api_shared::BatchUploadRes,
        api_shared::FileInfoRes,
        api_shared::DeleteAssetRes,
        api_shared::StorageStatsRes,
        api_shared::RecordReferenceRes,
        api_shared::CollaboratorReportRes,
        api_shared::ReferenceValidationRes,
        api_shared::CleanupRes,
        api_shared::RepairRes,
    ))
)]
pub struct ApiDoc;

/// Builds the application router.
///
/// Requests larger than the configured upload limit are still accepted up to a batch-sized
/// body so that the validator, not the transport, reports oversized files.
pub fn build_router(state: AppState) -> Router {
    let cfg = state.service.config();
    let upload_root = cfg.upload_root().to_path_buf();
    let public_prefix = cfg.public_prefix().to_string();
    let body_limit = usize::try_from(cfg.max_upload_bytes())
        .unwrap_or(usize::MAX)
        .saturating_mul(MAX_BATCH_FILES)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/media/upload", post(handlers::upload))
        .route("/media/upload/batch", post(handlers::upload_batch))
        .route(
            "/media/assets/*path",
            get(handlers::asset_info).delete(handlers::delete_asset),
        )
        .route("/media/stats", get(handlers::storage_stats))
        .route("/media/references", get(handlers::validate_references))
        .route("/media/cleanup", post(handlers::cleanup_orphans))
        .route("/media/repair", post(handlers::fix_broken_references))
        .nest_service(&public_prefix, ServeDir::new(upload_root))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the REST API on `addr` until the server stops.
///
/// # Errors
/// Returns an error if:
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
pub async fn serve(service: Arc<MediaService>, addr: &str) -> anyhow::Result<()> {
    tracing::info!("-- Starting media REST API on {}", addr);

    let app = build_router(AppState::new(service));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

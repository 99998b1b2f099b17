//! HTTP handlers.
//!
//! Core calls block on disk and CPU work, so every handler runs them through
//! [`tokio::task::spawn_blocking`].

use crate::error::{join_error, media_error, multipart_error, ApiError};
use crate::AppState;
use api_shared::{
    BatchUploadRes, CleanupRes, DeleteAssetRes, FileInfoRes, HealthRes, HealthService,
    ReferenceValidationRes, RepairRes, StorageStatsRes, UploadRes,
};
use axum::{
    extract::{Multipart, Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
};
use media_core::{MediaService, OutputFormat, UploadFile, UploadOptions};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

/// Multipart field carrying the file for single uploads.
const FILE_FIELD: &str = "file";

/// Query parameters for upload endpoints.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// Category subdirectory, e.g. `banks`
    pub subdirectory: String,
    /// Filename prefix; defaults to the subdirectory
    pub prefix: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// `webp`, `jpeg` or `png`
    pub format: Option<String>,
    /// 1-100
    pub quality: Option<u8>,
}

impl UploadQuery {
    fn into_options(self) -> Result<UploadOptions, ApiError> {
        let format = self
            .format
            .as_deref()
            .map(str::parse::<OutputFormat>)
            .transpose()
            .map_err(media_error)?;

        let prefix = self.prefix.unwrap_or_else(|| self.subdirectory.clone());
        Ok(UploadOptions {
            prefix,
            subdirectory: self.subdirectory,
            width: self.width,
            height: self.height,
            format,
            quality: self.quality,
        })
    }
}

async fn run_blocking<T, F>(service: Arc<MediaService>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&MediaService) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(join_error)
}

/// Collects the file parts of a multipart body, in order.
///
/// With `only_field` set, parts with any other name are skipped.
async fn read_files(
    mut multipart: Multipart,
    only_field: Option<&str>,
) -> Result<Vec<UploadFile>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if only_field.is_some_and(|name| field.name() != Some(name)) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        files.push(UploadFile::new(filename, mime, bytes.to_vec()));
    }
    Ok(files)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
pub(crate) async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/media/upload",
    params(UploadQuery),
    request_body(content = String, content_type = "multipart/form-data", description = "Image in the `file` field"),
    responses(
        (status = 201, description = "Upload stored", body = UploadRes),
        (status = 400, description = "Missing file, corrupt image or invalid options"),
        (status = 413, description = "File exceeds the maximum upload size"),
        (status = 415, description = "Unsupported file type"),
        (status = 500, description = "Internal server error")
    )
)]
/// Validate, transcode and store a single image
///
/// Returns the relative path to store in the owning record.
#[axum::debug_handler]
pub(crate) async fn upload(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadRes>), ApiError> {
    let options = query.into_options()?;
    let file = read_files(multipart, Some(FILE_FIELD)).await?.into_iter().next();

    let asset = run_blocking(state.service, move |svc| {
        svc.process_upload(file.as_ref(), &options)
    })
    .await?
    .map_err(media_error)?;

    Ok((StatusCode::CREATED, Json(asset.into())))
}

#[utoipa::path(
    post,
    path = "/media/upload/batch",
    params(UploadQuery),
    request_body(content = String, content_type = "multipart/form-data", description = "One or more image file parts"),
    responses(
        (status = 200, description = "Per-file results", body = BatchUploadRes),
        (status = 400, description = "No files or invalid options"),
        (status = 500, description = "Internal server error")
    )
)]
/// Upload several images with the same options
///
/// Each file succeeds or fails on its own; failures are listed with their reason.
#[axum::debug_handler]
pub(crate) async fn upload_batch(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    multipart: Multipart,
) -> Result<Json<BatchUploadRes>, ApiError> {
    let options = query.into_options()?;
    let files = read_files(multipart, None).await?;

    let outcome = run_blocking(state.service, move |svc| {
        svc.process_upload_batch(&files, &options)
    })
    .await?
    .map_err(media_error)?;

    Ok(Json(outcome.into()))
}

#[utoipa::path(
    get,
    path = "/media/assets/{path}",
    params(("path" = String, Path, description = "Path relative to the upload root")),
    responses(
        (status = 200, description = "File metadata", body = FileInfoRes),
        (status = 404, description = "No such file")
    )
)]
#[axum::debug_handler]
pub(crate) async fn asset_info(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
) -> Result<Json<FileInfoRes>, ApiError> {
    let info = run_blocking(state.service, move |svc| {
        svc.get_asset_info(path.trim_start_matches('/'))
    })
    .await?;
    match info {
        Some(info) => Ok(Json(info.into())),
        None => Err((StatusCode::NOT_FOUND, "Asset not found".into())),
    }
}

#[utoipa::path(
    delete,
    path = "/media/assets/{path}",
    params(("path" = String, Path, description = "Path relative to the upload root")),
    responses(
        (status = 200, description = "Whether a file was removed", body = DeleteAssetRes)
    )
)]
/// Delete a stored file
///
/// Best-effort: a missing file is reported as `deleted: false`, not an error.
#[axum::debug_handler]
pub(crate) async fn delete_asset(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
) -> Result<Json<DeleteAssetRes>, ApiError> {
    let deleted = run_blocking(state.service, move |svc| {
        svc.delete_asset(path.trim_start_matches('/'))
    })
    .await?;
    Ok(Json(DeleteAssetRes { deleted }))
}

#[utoipa::path(
    get,
    path = "/media/stats",
    responses(
        (status = 200, description = "Storage statistics over referenced files", body = StorageStatsRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn storage_stats(
    State(state): State<AppState>,
) -> Result<Json<StorageStatsRes>, ApiError> {
    let stats = run_blocking(state.service, |svc| svc.get_storage_stats()).await?;
    Ok(Json(stats.into()))
}

#[utoipa::path(
    get,
    path = "/media/references",
    responses(
        (status = 200, description = "Valid and broken references per collaborator, plus orphaned files", body = ReferenceValidationRes),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
pub(crate) async fn validate_references(
    State(state): State<AppState>,
) -> Result<Json<ReferenceValidationRes>, ApiError> {
    let validation = run_blocking(state.service, |svc| svc.validate_references())
        .await?
        .map_err(media_error)?;
    Ok(Json(validation.into()))
}

#[utoipa::path(
    post,
    path = "/media/cleanup",
    responses(
        (status = 200, description = "Orphan cleanup summary", body = CleanupRes),
        (status = 500, description = "Internal server error")
    )
)]
/// Delete files that no record references
#[axum::debug_handler]
pub(crate) async fn cleanup_orphans(
    State(state): State<AppState>,
) -> Result<Json<CleanupRes>, ApiError> {
    let summary = run_blocking(state.service, |svc| svc.cleanup_orphans())
        .await?
        .map_err(media_error)?;
    Ok(Json(summary.into()))
}

#[utoipa::path(
    post,
    path = "/media/repair",
    responses(
        (status = 200, description = "Broken reference repair summary", body = RepairRes)
    )
)]
/// Null every reference that points at a missing file
#[axum::debug_handler]
pub(crate) async fn fix_broken_references(
    State(state): State<AppState>,
) -> Result<Json<RepairRes>, ApiError> {
    let summary = run_blocking(state.service, |svc| svc.fix_broken_references()).await?;
    Ok(Json(summary.into()))
}

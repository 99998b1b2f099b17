use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_core::{
    MediaService,
    constants::{DEFAULT_REST_ADDR, ENV_REST_ADDR},
    load_config,
};

/// Main entry point for the media service
///
/// Resolves configuration once, prepares the upload root and serves the REST API.
///
/// # Environment Variables
/// - `MEDIA_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `MEDIA_UPLOAD_ROOT`: Upload root directory (default: "uploads")
/// - `MEDIA_RECORDS_DIR`: Directory of JSON record files (default: "records")
/// - `MEDIA_COLLABORATORS_FILE`: Optional YAML collaborator list
/// - `MEDIA_MAX_UPLOAD_BYTES`: Upload size limit (default: 5 MiB)
/// - `MEDIA_ORPHAN_GRACE_SECS`: Minimum age before orphan deletion (default: 60)
/// - `MEDIA_PUBLIC_PREFIX`: URL prefix for stored files (default: "/uploads")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - configuration values are invalid,
/// - the upload root or collaborator list cannot be prepared, or
/// - the HTTP server fails to bind or run.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("media_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = load_config(|key| std::env::var(key).ok())?;
    let rest_addr = std::env::var(ENV_REST_ADDR).unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    tracing::info!(
        upload_root = %cfg.upload_root().display(),
        records_dir = %cfg.records_dir().display(),
        max_upload_bytes = cfg.max_upload_bytes(),
        "++ Media configuration resolved"
    );

    let service = MediaService::from_config(cfg)?;
    service.bootstrap()?;

    let names: Vec<&str> = service
        .registry()
        .collaborators()
        .iter()
        .map(|c| c.name())
        .collect();
    tracing::info!("++ Registered collaborators: {}", names.join(", "));

    api_rest::serve(Arc::new(service), &rest_addr).await
}

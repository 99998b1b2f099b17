//! Constants used throughout the media core crate.

/// Default upload root when no explicit directory is configured.
pub const DEFAULT_UPLOAD_ROOT: &str = "uploads";

/// Default directory holding JSON record files for file-backed collaborators.
pub const DEFAULT_RECORDS_DIR: &str = "records";

/// Default URL prefix under which the upload root is served.
pub const DEFAULT_PUBLIC_PREFIX: &str = "/uploads";

/// Default maximum accepted upload size (5 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Default minimum age, in seconds, before an unreferenced file may be deleted.
pub const DEFAULT_ORPHAN_GRACE_SECS: u64 = 60;

/// Declared MIME types accepted by the validator.
pub const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Default transcode bounds and quality.
pub const DEFAULT_TARGET_WIDTH: u32 = 1200;
pub const DEFAULT_TARGET_HEIGHT: u32 = 1200;
pub const DEFAULT_QUALITY: u8 = 85;

/// Category subdirectories created under the upload root at startup.
pub const CATEGORY_DIRS: [&str; 5] = ["banks", "sponsors", "schools", "gallery", "alerts"];

/// Environment keys read by [`crate::config::load_config`].
pub const ENV_UPLOAD_ROOT: &str = "MEDIA_UPLOAD_ROOT";
pub const ENV_RECORDS_DIR: &str = "MEDIA_RECORDS_DIR";
pub const ENV_COLLABORATORS_FILE: &str = "MEDIA_COLLABORATORS_FILE";
pub const ENV_MAX_UPLOAD_BYTES: &str = "MEDIA_MAX_UPLOAD_BYTES";
pub const ENV_ORPHAN_GRACE_SECS: &str = "MEDIA_ORPHAN_GRACE_SECS";
pub const ENV_PUBLIC_PREFIX: &str = "MEDIA_PUBLIC_PREFIX";

/// Server bind address, read by the server binary rather than [`crate::config::load_config`].
pub const ENV_REST_ADDR: &str = "MEDIA_REST_ADDR";
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

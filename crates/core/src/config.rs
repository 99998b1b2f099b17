//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. Core
//! services never read process-wide environment variables during request handling; binaries
//! call [`load_config`] with a lookup closure (usually `std::env::var`) and tests pass a map.

use crate::constants::{
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_ORPHAN_GRACE_SECS, DEFAULT_PUBLIC_PREFIX,
    DEFAULT_RECORDS_DIR, DEFAULT_UPLOAD_ROOT, ENV_COLLABORATORS_FILE, ENV_MAX_UPLOAD_BYTES,
    ENV_ORPHAN_GRACE_SECS, ENV_PUBLIC_PREFIX, ENV_RECORDS_DIR, ENV_UPLOAD_ROOT,
};
use crate::{MediaError, MediaResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct MediaConfig {
    upload_root: PathBuf,
    records_dir: PathBuf,
    collaborators_file: Option<PathBuf>,
    max_upload_bytes: u64,
    orphan_grace: Duration,
    public_prefix: String,
}

impl MediaConfig {
    /// Create a new `MediaConfig`.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::InvalidInput` if `max_upload_bytes` is zero or `public_prefix` is
    /// empty or does not start with `/`.
    pub fn new(
        upload_root: PathBuf,
        records_dir: PathBuf,
        max_upload_bytes: u64,
        orphan_grace: Duration,
        public_prefix: String,
    ) -> MediaResult<Self> {
        if max_upload_bytes == 0 {
            return Err(MediaError::InvalidInput(
                "max_upload_bytes must be greater than zero".into(),
            ));
        }

        let public_prefix = public_prefix.trim().trim_end_matches('/').to_string();
        if public_prefix.is_empty() || !public_prefix.starts_with('/') {
            return Err(MediaError::InvalidInput(
                "public_prefix must be a root-relative path such as /uploads".into(),
            ));
        }

        Ok(Self {
            upload_root,
            records_dir,
            collaborators_file: None,
            max_upload_bytes,
            orphan_grace,
            public_prefix,
        })
    }

    /// Use a YAML file to declare the collaborator set instead of the built-in defaults.
    pub fn with_collaborators_file(mut self, path: PathBuf) -> Self {
        self.collaborators_file = Some(path);
        self
    }

    /// Override the orphan grace period.
    pub fn with_orphan_grace(mut self, grace: Duration) -> Self {
        self.orphan_grace = grace;
        self
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    pub fn collaborators_file(&self) -> Option<&Path> {
        self.collaborators_file.as_deref()
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    pub fn orphan_grace(&self) -> Duration {
        self.orphan_grace
    }

    /// URL prefix without a trailing slash, e.g. `/uploads`.
    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Returns the public URL for a relative asset path.
    pub fn public_url(&self, relative_path: &str) -> String {
        format!("{}/{}", self.public_prefix, relative_path.trim_start_matches('/'))
    }
}

/// Build a `MediaConfig` from a key lookup.
///
/// Missing or blank keys fall back to the defaults in [`crate::constants`].
///
/// # Errors
///
/// Returns `MediaError::InvalidInput` if a numeric key does not parse or a value is rejected by
/// [`MediaConfig::new`].
pub fn load_config<F>(lookup: F) -> MediaResult<MediaConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let value = |key: &str| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let upload_root = value(ENV_UPLOAD_ROOT).unwrap_or_else(|| DEFAULT_UPLOAD_ROOT.into());
    let records_dir = value(ENV_RECORDS_DIR).unwrap_or_else(|| DEFAULT_RECORDS_DIR.into());
    let public_prefix = value(ENV_PUBLIC_PREFIX).unwrap_or_else(|| DEFAULT_PUBLIC_PREFIX.into());

    let max_upload_bytes =
        u64_from_env_value(ENV_MAX_UPLOAD_BYTES, value(ENV_MAX_UPLOAD_BYTES))?
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
    let grace_secs = u64_from_env_value(ENV_ORPHAN_GRACE_SECS, value(ENV_ORPHAN_GRACE_SECS))?
        .unwrap_or(DEFAULT_ORPHAN_GRACE_SECS);

    let mut cfg = MediaConfig::new(
        PathBuf::from(upload_root),
        PathBuf::from(records_dir),
        max_upload_bytes,
        Duration::from_secs(grace_secs),
        public_prefix,
    )?;

    if let Some(file) = value(ENV_COLLABORATORS_FILE) {
        cfg = cfg.with_collaborators_file(PathBuf::from(file));
    }

    Ok(cfg)
}

/// Parse an optional numeric setting.
fn u64_from_env_value(key: &str, value: Option<String>) -> MediaResult<Option<u64>> {
    value
        .map(|v| {
            v.parse::<u64>().map_err(|_| {
                MediaError::InvalidInput(format!(
                    "{} must be a non-negative integer, got '{}'",
                    key, v
                ))
            })
        })
        .transpose()
}

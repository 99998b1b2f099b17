//! Asset filename generation.
//!
//! Uploaded assets are stored under names derived from a category prefix, the upload time and a
//! short random suffix:
//!
//! `{prefix}-{unix_millis}-{8 lowercase hex}{.ext}`
//!
//! Example:
//! `logo-1760601234567-0a1b2c3d.webp`
//!
//! Names are:
//! - Sortable by upload time within a prefix
//! - Unique per [`AssetNamer`] (timestamps are strictly increasing within one namer)
//! - Not content hashes: identical uploads produce different names
//!
//! Across processes two names can still collide if both the millisecond and the 32-bit random
//! suffix match. The storage layer does not detect that case.

mod namer;

pub use namer::{extension_of, normalise_prefix, AssetName, AssetNamer};

/// Error type for naming operations.
#[derive(Debug, thiserror::Error)]
pub enum NamingError {
    /// Prefix was empty or contained characters outside `[a-z0-9_-]`
    #[error("Invalid prefix: {0}")]
    InvalidPrefix(String),

    /// A filename did not follow the `{prefix}-{millis}-{hex}{ext}` layout
    #[error("Invalid asset name: {0}")]
    InvalidName(String),
}

/// Result type for naming operations.
pub type NamingResult<T> = Result<T, NamingError>;

//! Media File Storage
//!
//! This crate owns the upload root: the directory tree where transcoded images are written,
//! listed, inspected and removed.
//!
//! ## Design Principles
//!
//! - Identity is the relative path (`<category>/<filename>`), not a content hash
//! - No in-memory index of stored files is kept; every call goes to the filesystem
//! - Deletion is best-effort and never fails loudly
//! - All caller-supplied paths are confined to the upload root
//!
//! ## Layout
//!
//! ```text
//! <upload_root>/
//! ├── banks/
//! │   ├── .gitkeep
//! │   └── logo-1760601234567-0a1b2c3d.webp
//! ├── sponsors/
//! ├── schools/
//! ├── gallery/
//! └── alerts/
//! ```
//!
//! The `.gitkeep` marker keeps empty category directories under version control and is
//! invisible to [`AssetStore::list_all`].
//!
//! ## Example Usage
//!
//! ```no_run
//! use media_files::AssetStore;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = AssetStore::new(Path::new("uploads"))?;
//! let relative_path = store.save(b"...", "logo-1760601234567-0a1b2c3d.webp", "banks")?;
//! assert!(store.stat(&relative_path).is_some());
//! # Ok(())
//! # }
//! ```

mod constants;
mod store;

pub use constants::KEEP_FILE_NAME;
pub use store::{AssetStore, FileInfo};

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Upload root exists but is not a directory, or cannot be created
    #[error("Invalid upload root: {0}")]
    InvalidRootDirectory(String),

    /// Path validation failed (absolute path, traversal, or reserved name)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! Upload-root storage service implementation
//!
//! This module provides [`AssetStore`], the persistence layer for uploaded images. It writes
//! already-transcoded bytes into category subdirectories, answers existence and metadata
//! queries, lists the whole tree for reconciliation and removes files on request.
//!
//! # Path Model
//!
//! Every asset is addressed by a path relative to the upload root, always using `/` as the
//! separator (`gallery/school-1760601234567-0a1b2c3d.webp`). Relative paths are validated before
//! they touch the filesystem:
//!
//! - must not be empty or absolute
//! - must contain only normal components (no `.`, `..`, root or drive prefixes)
//! - must not contain backslashes
//!
//! Only regular files count as assets. Symlinks are neither listed nor reported by
//! [`AssetStore::stat`], so a reference that resolves to a symlink is treated as missing.
//!
//! # Consistency
//!
//! The store keeps no state between calls. [`AssetStore::list_all`] is a snapshot: files
//! created or deleted while the walk runs may or may not be included.

use crate::{FilesError, KEEP_FILE_NAME};
use chrono::{DateTime, Utc};
use media_types::NonEmptyText;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Metadata for a stored asset
///
/// Dimensions and media type are best-effort: they are read from the file header and are
/// `None` for files that are not decodable images.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FileInfo {
    /// Path relative to the upload root
    pub relative_path: NonEmptyText,

    /// Size of the file in bytes
    pub size_bytes: u64,

    /// Pixel width, if the file is a readable image
    pub width: Option<u32>,

    /// Pixel height, if the file is a readable image
    pub height: Option<u32>,

    /// Detected media type (MIME type) from the file's magic bytes
    pub media_type: Option<NonEmptyText>,

    /// Creation time; falls back to the modification time where the filesystem has no birth time
    pub created_at: DateTime<Utc>,

    /// Last modification time
    pub modified_at: DateTime<Utc>,
}

/// Service for managing files under the upload root
///
/// # Design
///
/// - Root-scoped: each instance is bound to one canonicalised upload root
/// - Stateless: no caching of directory contents
/// - Confined: caller paths are validated to stay inside the root
#[derive(Debug, Clone)]
pub struct AssetStore {
    upload_root: PathBuf,
}

impl AssetStore {
    /// Opens the store rooted at `upload_root`, creating the directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - the path exists but is not a directory
    /// - the directory cannot be created or canonicalised
    pub fn new(upload_root: &Path) -> Result<Self, FilesError> {
        if upload_root.exists() && !upload_root.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                upload_root.display()
            )));
        }

        fs::create_dir_all(upload_root).map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot create upload root {}: {}",
                upload_root.display(),
                e
            ))
        })?;

        let upload_root = upload_root.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                upload_root.display(),
                e
            ))
        })?;

        Ok(Self { upload_root })
    }

    /// Returns the canonicalised upload root
    #[must_use]
    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    /// Creates each category subdirectory with a keep-file marker.
    ///
    /// Existing directories and markers are left untouched.
    pub fn ensure_categories<I, S>(&self, categories: I) -> Result<(), FilesError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for category in categories {
            let dir = self.resolve(category.as_ref())?;
            fs::create_dir_all(&dir).map_err(|e| {
                FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create category directory {}: {}", dir.display(), e),
                ))
            })?;

            let marker = dir.join(KEEP_FILE_NAME);
            if !marker.exists() {
                fs::write(&marker, b"")?;
            }
        }
        Ok(())
    }

    /// Writes `bytes` to `<subdirectory>/<filename>` and returns the relative path.
    ///
    /// The subdirectory is created if needed. An existing file with the same name is
    /// overwritten; uniqueness is the namer's responsibility.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - `subdirectory` is not a safe relative path
    /// - `filename` is not a single safe path component, or is the keep-file marker
    /// - directory creation or the write fails (I/O)
    pub fn save(
        &self,
        bytes: &[u8],
        filename: &str,
        subdirectory: &str,
    ) -> Result<String, FilesError> {
        let subdirectory = normalise_relative(subdirectory)?;
        validate_filename(filename)?;

        let dir = self.upload_root.join(&subdirectory);
        fs::create_dir_all(&dir).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create storage directory {}: {}", dir.display(), e),
            ))
        })?;

        let target = dir.join(filename);
        fs::write(&target, bytes).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write file to {}: {}", target.display(), e),
            ))
        })?;

        let relative_path = format!("{}/{}", subdirectory, filename);
        tracing::debug!(path = %relative_path, bytes = bytes.len(), "stored asset");
        Ok(relative_path)
    }

    /// Removes the file at `relative_path`.
    ///
    /// Returns `false` when the path is unsafe, missing, not a regular file, or cannot be
    /// removed. Callers treat `false` as "nothing to clean up".
    pub fn delete(&self, relative_path: &str) -> bool {
        let Ok(path) = self.resolve(relative_path) else {
            tracing::debug!(path = %relative_path, "refusing to delete unsafe path");
            return false;
        };

        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_file() => {}
            _ => return false,
        }

        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(path = %relative_path, error = %e, "failed to delete asset");
                false
            }
        }
    }

    /// Returns metadata for `relative_path`, or `None` if it does not name a regular file.
    pub fn stat(&self, relative_path: &str) -> Option<FileInfo> {
        let normalised = normalise_relative(relative_path).ok()?;
        let path = self.upload_root.join(&normalised);

        let meta = fs::symlink_metadata(&path).ok()?;
        if !meta.is_file() {
            return None;
        }

        let modified_at: DateTime<Utc> = meta.modified().ok()?.into();
        let created_at = meta
            .created()
            .map(DateTime::<Utc>::from)
            .unwrap_or(modified_at);

        let (width, height) = match image::image_dimensions(&path) {
            Ok((w, h)) => (Some(w), Some(h)),
            Err(_) => (None, None),
        };

        let media_type = infer::get_from_path(&path)
            .ok()
            .flatten()
            .and_then(|kind| NonEmptyText::new(kind.mime_type()).ok());

        Some(FileInfo {
            relative_path: NonEmptyText::new(&normalised).ok()?,
            size_bytes: meta.len(),
            width,
            height,
            media_type,
            created_at,
            modified_at,
        })
    }

    /// Returns true if `relative_path` names an existing regular file.
    pub fn exists(&self, relative_path: &str) -> bool {
        self.resolve(relative_path)
            .ok()
            .and_then(|p| fs::symlink_metadata(p).ok())
            .is_some_and(|m| m.is_file())
    }

    /// Returns the last modification time of a regular file, without reading its contents.
    pub fn modified_at(&self, relative_path: &str) -> Option<DateTime<Utc>> {
        let path = self.resolve(relative_path).ok()?;
        let meta = fs::symlink_metadata(path).ok()?;
        if !meta.is_file() {
            return None;
        }
        meta.modified().ok().map(DateTime::<Utc>::from)
    }

    /// Recursively lists every regular file under the upload root as sorted relative paths.
    ///
    /// Keep-file markers, symlinks and entries with non-UTF-8 names are skipped. Errors on
    /// individual entries are logged and the walk continues.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::Io` if the upload root itself cannot be read.
    pub fn list_all(&self) -> Result<Vec<String>, FilesError> {
        if !self.upload_root.is_dir() {
            return Err(FilesError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!(
                    "Upload root is missing or not a directory: {}",
                    self.upload_root.display()
                ),
            )));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.upload_root).follow_links(false).min_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Error accessing entry under upload root: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || entry.file_name() == KEEP_FILE_NAME {
                continue;
            }

            match self.relative_of(entry.path()) {
                Some(relative) => paths.push(relative),
                None => tracing::warn!(
                    "Skipping file with non UTF-8 path: {}",
                    entry.path().display()
                ),
            }
        }

        paths.sort();
        Ok(paths)
    }

    /// Resolves a relative path to an absolute path inside the upload root.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidPath` if the path is empty, absolute, or escapes the root.
    pub fn resolve(&self, relative_path: &str) -> Result<PathBuf, FilesError> {
        let normalised = normalise_relative(relative_path)?;
        Ok(self.upload_root.join(normalised))
    }

    fn relative_of(&self, path: &Path) -> Option<String> {
        let stripped = path.strip_prefix(&self.upload_root).ok()?;
        let parts: Option<Vec<&str>> = stripped
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect();
        Some(parts?.join("/"))
    }
}

/// Validates a relative path and returns it joined with `/`.
fn normalise_relative(relative_path: &str) -> Result<String, FilesError> {
    let trimmed = relative_path.trim().trim_end_matches('/');

    if trimmed.is_empty() {
        return Err(FilesError::InvalidPath("path cannot be empty".into()));
    }

    if trimmed.contains('\\') {
        return Err(FilesError::InvalidPath(format!(
            "path must use '/' separators: {}",
            relative_path
        )));
    }

    let mut parts = Vec::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    FilesError::InvalidPath(format!("path is not valid UTF-8: {}", relative_path))
                })?;
                parts.push(part);
            }
            _ => {
                return Err(FilesError::InvalidPath(format!(
                    "path must be relative and must not contain '.' or '..': {}",
                    relative_path
                )));
            }
        }
    }

    // `Path::components` silently drops interior `.` segments
    if trimmed.split('/').any(|s| s == "." || s == "..") {
        return Err(FilesError::InvalidPath(format!(
            "path must not contain '.' or '..': {}",
            relative_path
        )));
    }

    Ok(parts.join("/"))
}

fn validate_filename(filename: &str) -> Result<(), FilesError> {
    let mut components = Path::new(filename).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if !single || filename.contains(['/', '\\']) {
        return Err(FilesError::InvalidPath(format!(
            "filename must be a single path component: {}",
            filename
        )));
    }

    if filename == KEEP_FILE_NAME {
        return Err(FilesError::InvalidPath(format!(
            "filename is reserved: {}",
            filename
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;
    use tempfile::TempDir;

    /// Helper to create a store under a fresh temporary directory
    fn create_test_store() -> (TempDir, AssetStore) {
        let temp = TempDir::new().unwrap();
        let store = AssetStore::new(&temp.path().join("uploads")).unwrap();
        (temp, store)
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 128]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_new_creates_missing_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("does/not/exist");

        let store = AssetStore::new(&root).unwrap();

        assert!(root.is_dir());
        assert!(store.upload_root().is_absolute());
    }

    #[test]
    fn test_new_root_not_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("file.txt");
        fs::write(&root, "not a directory").unwrap();

        let store = AssetStore::new(&root);

        assert!(matches!(store, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_save_creates_subdirectory() {
        let (_temp, store) = create_test_store();

        let relative = store.save(b"hello", "a.webp", "banks").unwrap();

        assert_eq!(relative, "banks/a.webp");
        let stored = fs::read(store.upload_root().join("banks/a.webp")).unwrap();
        assert_eq!(stored, b"hello");
    }

    #[test]
    fn test_save_nested_subdirectory() {
        let (_temp, store) = create_test_store();

        let relative = store.save(b"x", "g.webp", "schools/gallery/").unwrap();

        assert_eq!(relative, "schools/gallery/g.webp");
        assert!(store.exists("schools/gallery/g.webp"));
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let (_temp, store) = create_test_store();

        store.save(b"first", "a.webp", "banks").unwrap();
        store.save(b"second", "a.webp", "banks").unwrap();

        let stored = fs::read(store.upload_root().join("banks/a.webp")).unwrap();
        assert_eq!(stored, b"second");
    }

    #[test]
    fn test_save_rejects_traversal() {
        let (_temp, store) = create_test_store();

        for subdirectory in ["../outside", "/etc", "banks/../..", "./banks", ""] {
            let result = store.save(b"x", "a.webp", subdirectory);
            assert!(
                matches!(result, Err(FilesError::InvalidPath(_))),
                "subdirectory {subdirectory:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_save_rejects_bad_filenames() {
        let (_temp, store) = create_test_store();

        for filename in ["", "a/b.webp", "..", ".gitkeep", "a\\b.webp"] {
            let result = store.save(b"x", filename, "banks");
            assert!(
                matches!(result, Err(FilesError::InvalidPath(_))),
                "filename {filename:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_delete_existing_file() {
        let (_temp, store) = create_test_store();
        let relative = store.save(b"x", "a.webp", "banks").unwrap();

        assert!(store.delete(&relative));
        assert!(!store.exists(&relative));
    }

    #[test]
    fn test_delete_missing_file_returns_false() {
        let (_temp, store) = create_test_store();

        assert!(!store.delete("banks/missing.webp"));
    }

    #[test]
    fn test_delete_refuses_directories_and_unsafe_paths() {
        let (temp, store) = create_test_store();
        store.save(b"x", "a.webp", "banks").unwrap();
        let outside = temp.path().join("outside.txt");
        fs::write(&outside, "keep me").unwrap();

        assert!(!store.delete("banks"));
        assert!(!store.delete("../outside.txt"));
        assert!(outside.exists());
    }

    #[test]
    fn test_modified_at() {
        let (_temp, store) = create_test_store();
        let relative = store.save(b"x", "m.webp", "alerts").unwrap();

        let modified = store.modified_at(&relative).unwrap();

        assert!(Utc::now() - modified < chrono::Duration::minutes(5));
        assert!(store.modified_at("alerts").is_none());
        assert!(store.modified_at("alerts/missing.webp").is_none());
    }

    #[test]
    fn test_stat_missing_returns_none() {
        let (_temp, store) = create_test_store();

        assert!(store.stat("gallery/nope.webp").is_none());
        assert!(store.stat("../etc/passwd").is_none());
    }

    #[test]
    fn test_stat_image_file() {
        let (_temp, store) = create_test_store();
        let bytes = png_bytes(40, 20);
        let relative = store.save(&bytes, "p.png", "gallery").unwrap();

        let info = store.stat(&relative).unwrap();

        assert_eq!(info.relative_path.as_str(), "gallery/p.png");
        assert_eq!(info.size_bytes, bytes.len() as u64);
        assert_eq!(info.width, Some(40));
        assert_eq!(info.height, Some(20));
        assert_eq!(
            info.media_type.as_ref().map(|t| t.as_str()),
            Some("image/png")
        );
        assert!(info.created_at <= Utc::now());
    }

    #[test]
    fn test_stat_non_image_file() {
        let (_temp, store) = create_test_store();
        let relative = store.save(b"plain text", "notes.txt", "alerts").unwrap();

        let info = store.stat(&relative).unwrap();

        assert_eq!(info.size_bytes, 10);
        assert_eq!(info.width, None);
        assert_eq!(info.media_type, None);
    }

    #[test]
    fn test_stat_directory_returns_none() {
        let (_temp, store) = create_test_store();
        store.save(b"x", "a.webp", "banks").unwrap();

        assert!(store.stat("banks").is_none());
    }

    #[test]
    fn test_list_all_skips_keep_files() {
        let (_temp, store) = create_test_store();
        store
            .ensure_categories(["banks", "sponsors", "gallery"])
            .unwrap();
        store.save(b"x", "b.webp", "banks").unwrap();
        store.save(b"y", "a.webp", "gallery").unwrap();
        store.save(b"z", "n.webp", "schools/2024").unwrap();

        let listed = store.list_all().unwrap();

        assert_eq!(
            listed,
            vec!["banks/b.webp", "gallery/a.webp", "schools/2024/n.webp"]
        );
    }

    #[test]
    fn test_list_all_empty_root() {
        let (_temp, store) = create_test_store();

        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_ensure_categories_is_idempotent() {
        let (_temp, store) = create_test_store();

        store.ensure_categories(["banks"]).unwrap();
        store.ensure_categories(["banks"]).unwrap();

        assert!(store.upload_root().join("banks").join(KEEP_FILE_NAME).exists());
    }

    #[test]
    fn test_ensure_categories_rejects_traversal() {
        let (_temp, store) = create_test_store();

        assert!(matches!(
            store.ensure_categories([".."]),
            Err(FilesError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_normalise_relative() {
        assert_eq!(normalise_relative("banks/a.webp").unwrap(), "banks/a.webp");
        assert_eq!(normalise_relative("banks//a.webp").unwrap(), "banks/a.webp");
        assert!(normalise_relative("banks/./a.webp").is_err());
        assert!(normalise_relative("/banks/a.webp").is_err());
    }

    #[test]
    fn test_file_info_serialization() {
        let (_temp, store) = create_test_store();
        let relative = store.save(&png_bytes(4, 4), "p.png", "banks").unwrap();
        let info = store.stat(&relative).unwrap();

        let json = serde_json::to_string(&info).unwrap();

        assert!(json.contains("\"relative_path\":\"banks/p.png\""));
        assert!(json.contains("image/png"));
    }
}

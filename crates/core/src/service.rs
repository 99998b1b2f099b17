//! The media service facade used by the REST layer and the CLI.

use crate::collaborators::build_registry;
use crate::config::MediaConfig;
use crate::constants::CATEGORY_DIRS;
use crate::reconcile::{
    CleanupSummary, ReconciliationEngine, ReferenceValidation, RepairSummary, StorageStats,
    ValidationReport,
};
use crate::registry::ReferenceRegistry;
use crate::transcode::Transcoder;
use crate::upload::{BatchUploadOutcome, FailedUpload, UploadOptions, UploadedAsset};
use crate::validation::{UploadFile, Validator};
use crate::{MediaResult, ValidationError};
use media_files::{AssetStore, FileInfo};
use media_naming::AssetNamer;
use std::sync::Arc;

/// Upload pipeline and maintenance operations over one upload root.
///
/// All methods are blocking. Async callers should wrap them in `spawn_blocking`.
#[derive(Debug)]
pub struct MediaService {
    config: MediaConfig,
    validator: Validator,
    transcoder: Transcoder,
    namer: AssetNamer,
    store: AssetStore,
    engine: ReconciliationEngine,
}

impl MediaService {
    /// Opens the upload root and wires the pipeline to `registry`.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Storage` if the upload root cannot be created.
    pub fn new(config: MediaConfig, registry: ReferenceRegistry) -> MediaResult<Self> {
        let store = AssetStore::new(config.upload_root())?;
        let engine =
            ReconciliationEngine::new(store.clone(), Arc::new(registry), config.orphan_grace());

        Ok(Self {
            validator: Validator::new(config.max_upload_bytes()),
            transcoder: Transcoder::new(),
            namer: AssetNamer::new(),
            store,
            engine,
            config,
        })
    }

    /// Like [`MediaService::new`] with the file-backed collaborators declared by `config`.
    pub fn from_config(config: MediaConfig) -> MediaResult<Self> {
        let registry = build_registry(&config)?;
        Self::new(config, registry)
    }

    /// Creates the category directories under the upload root.
    pub fn bootstrap(&self) -> MediaResult<()> {
        self.store.ensure_categories(CATEGORY_DIRS)?;
        Ok(())
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    pub fn registry(&self) -> &ReferenceRegistry {
        self.engine.registry()
    }

    /// Validates, transcodes, names and stores one upload.
    ///
    /// Nothing is written unless every step before the write succeeds.
    ///
    /// # Errors
    ///
    /// - `MediaError::Validation` for missing, oversized or unsupported files
    /// - `MediaError::Storage` with `InvalidPath` for an unsafe subdirectory
    /// - `MediaError::Processing` for undecodable images
    /// - `MediaError::Naming` for an invalid prefix
    /// - `MediaError::Storage` with `Io` if the write fails
    pub fn process_upload(
        &self,
        file: Option<&UploadFile>,
        options: &UploadOptions,
    ) -> MediaResult<UploadedAsset> {
        self.validator.validate(file)?;
        let file = file.ok_or(ValidationError::MissingFile)?;

        self.store.resolve(&options.subdirectory)?;

        let transcoded = self
            .transcoder
            .optimize(file.bytes(), &options.transcode_options())?;

        // Stored names carry the extension of the stored bytes
        let renamed = format!(
            "{}.{}",
            file.original_filename(),
            transcoded.format.extension()
        );
        let filename = self.namer.name(&renamed, &options.prefix)?;

        let relative_path = self
            .store
            .save(&transcoded.bytes, &filename, &options.subdirectory)?;

        tracing::info!(
            path = %relative_path,
            original_size = file.size(),
            size = transcoded.bytes.len(),
            "upload stored"
        );

        Ok(UploadedAsset {
            url: self.config.public_url(&relative_path),
            filename,
            relative_path,
            byte_size: transcoded.bytes.len() as u64,
            original_byte_size: file.size(),
            mime_type: transcoded.format.mime_type().to_string(),
            width: transcoded.width,
            height: transcoded.height,
        })
    }

    /// Processes each file independently with the same options.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingFile` if `files` is empty. Per-file failures are
    /// reported in the outcome instead.
    pub fn process_upload_batch(
        &self,
        files: &[UploadFile],
        options: &UploadOptions,
    ) -> MediaResult<BatchUploadOutcome> {
        if files.is_empty() {
            return Err(ValidationError::MissingFile.into());
        }

        let mut outcome = BatchUploadOutcome::default();
        for file in files {
            match self.process_upload(Some(file), options) {
                Ok(asset) => outcome.succeeded.push(asset),
                Err(e) => {
                    tracing::warn!(filename = %file.original_filename(), error = %e, "batch upload item failed");
                    outcome.failed.push(FailedUpload {
                        filename: file.original_filename().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(outcome)
    }

    pub fn delete_asset(&self, relative_path: &str) -> bool {
        let deleted = self.store.delete(relative_path);
        if deleted {
            tracing::info!(path = %relative_path, "asset deleted");
        }
        deleted
    }

    pub fn get_asset_info(&self, relative_path: &str) -> Option<FileInfo> {
        self.store.stat(relative_path)
    }

    pub fn get_storage_stats(&self) -> StorageStats {
        self.engine.storage_stats()
    }

    pub fn validation_report(&self) -> ValidationReport {
        self.engine.validation_report()
    }

    pub fn validate_references(&self) -> MediaResult<ReferenceValidation> {
        self.engine.validate_references()
    }

    /// Orphaned files, without deleting them.
    pub fn list_orphans(&self) -> MediaResult<Vec<String>> {
        self.engine.orphaned_files()
    }

    pub fn cleanup_orphans(&self) -> MediaResult<CleanupSummary> {
        self.engine.cleanup_orphans()
    }

    pub fn fix_broken_references(&self) -> RepairSummary {
        self.engine.repair_broken_references()
    }
}

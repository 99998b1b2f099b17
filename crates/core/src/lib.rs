//! # Media Core
//!
//! Core logic for media asset storage and lifecycle management.
//!
//! This crate accepts uploaded images, validates and transcodes them, and stores them under
//! the upload root with collision-resistant names. It also reconciles the files on disk with
//! the references held by business-entity records:
//! - Upload pipeline: [`Validator`] → [`Transcoder`] → `AssetNamer` → `AssetStore`
//! - Reference scanning through registered [`EntityCollaborator`]s
//! - Orphan cleanup, broken-reference repair and storage statistics
//!
//! **No API concerns**: HTTP servers and command-line parsing belong in `api-rest` and `cli`.

pub mod collaborators;
pub mod config;
pub mod constants;
mod error;
pub mod reconcile;
pub mod registry;
pub mod service;
pub mod transcode;
pub mod upload;
pub mod validation;

pub use collaborators::{
    build_registry, CollaboratorSpec, EntityCollaborator, InMemoryCollaborator,
    JsonRecordCollaborator, ReferenceRecord,
};
pub use config::{load_config, MediaConfig};
pub use error::{CollaboratorError, MediaError, MediaResult, ValidationError};
pub use reconcile::{
    format_bytes, CleanupSummary, CollaboratorReport, RecordReference, ReferenceValidation,
    RepairSummary, StorageStats, ValidationReport,
};
pub use registry::ReferenceRegistry;
pub use service::MediaService;
pub use transcode::{OutputFormat, TranscodeOptions, Transcoder};
pub use upload::{uploaded_at, BatchUploadOutcome, FailedUpload, UploadOptions, UploadedAsset};
pub use validation::{UploadFile, Validator};

pub use media_files::{FileInfo, FilesError};

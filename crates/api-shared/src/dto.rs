//! Response bodies for the media APIs.
//!
//! Field names are camelCase on the wire. Timestamps are RFC 3339 strings.

use media_core::{
    uploaded_at, BatchUploadOutcome, CleanupSummary, CollaboratorReport, FailedUpload, FileInfo,
    RecordReference, ReferenceValidation, RepairSummary, StorageStats, UploadedAsset,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadRes {
    pub filename: String,
    pub relative_path: String,
    pub url: String,
    pub byte_size: u64,
    pub original_byte_size: u64,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

impl From<UploadedAsset> for UploadRes {
    fn from(asset: UploadedAsset) -> Self {
        Self {
            filename: asset.filename,
            relative_path: asset.relative_path,
            url: asset.url,
            byte_size: asset.byte_size,
            original_byte_size: asset.original_byte_size,
            mime_type: asset.mime_type,
            width: asset.width,
            height: asset.height,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FailedUploadRes {
    pub filename: String,
    pub error: String,
}

impl From<FailedUpload> for FailedUploadRes {
    fn from(failed: FailedUpload) -> Self {
        Self {
            filename: failed.filename,
            error: failed.error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchUploadRes {
    pub succeeded: Vec<UploadRes>,
    pub failed: Vec<FailedUploadRes>,
}

impl From<BatchUploadOutcome> for BatchUploadRes {
    fn from(outcome: BatchUploadOutcome) -> Self {
        Self {
            succeeded: outcome.succeeded.into_iter().map(Into::into).collect(),
            failed: outcome.failed.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileInfoRes {
    pub relative_path: String,
    pub size_bytes: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub media_type: Option<String>,
    pub created_at: String,
    pub modified_at: String,
    /// Upload time encoded in the filename, when it follows the naming layout
    pub uploaded_at: Option<String>,
}

impl From<FileInfo> for FileInfoRes {
    fn from(info: FileInfo) -> Self {
        let uploaded_at = uploaded_at(info.relative_path.as_str()).map(|at| at.to_rfc3339());
        Self {
            uploaded_at,
            relative_path: info.relative_path.into_inner(),
            size_bytes: info.size_bytes,
            width: info.width,
            height: info.height,
            media_type: info.media_type.map(|m| m.into_inner()),
            created_at: info.created_at.to_rfc3339(),
            modified_at: info.modified_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteAssetRes {
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageStatsRes {
    pub total_images: u64,
    pub total_size: u64,
    pub total_size_formatted: String,
    pub average_size: u64,
}

impl From<StorageStats> for StorageStatsRes {
    fn from(stats: StorageStats) -> Self {
        Self {
            total_images: stats.total_images as u64,
            total_size: stats.total_size,
            total_size_formatted: stats.total_size_formatted,
            average_size: stats.average_size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordReferenceRes {
    pub record_id: String,
    pub label: String,
    pub path: String,
}

impl From<RecordReference> for RecordReferenceRes {
    fn from(r: RecordReference) -> Self {
        Self {
            record_id: r.record_id,
            label: r.label,
            path: r.path,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorReportRes {
    pub collaborator: String,
    pub valid: Vec<RecordReferenceRes>,
    pub broken: Vec<RecordReferenceRes>,
    pub external_count: u64,
    pub error: Option<String>,
}

impl From<CollaboratorReport> for CollaboratorReportRes {
    fn from(report: CollaboratorReport) -> Self {
        Self {
            collaborator: report.collaborator,
            valid: report.valid.into_iter().map(Into::into).collect(),
            broken: report.broken.into_iter().map(Into::into).collect(),
            external_count: report.external_count as u64,
            error: report.error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceValidationRes {
    pub per_collaborator: Vec<CollaboratorReportRes>,
    pub orphaned: Vec<String>,
}

impl From<ReferenceValidation> for ReferenceValidationRes {
    fn from(validation: ReferenceValidation) -> Self {
        Self {
            per_collaborator: validation
                .per_collaborator
                .into_iter()
                .map(Into::into)
                .collect(),
            orphaned: validation.orphaned,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CleanupRes {
    pub deleted_count: u64,
    pub valid_paths_count: u64,
    pub failed_count: u64,
    pub skipped_recent_count: u64,
    pub failed_collaborators: Vec<String>,
}

impl From<CleanupSummary> for CleanupRes {
    fn from(summary: CleanupSummary) -> Self {
        Self {
            deleted_count: summary.deleted_count as u64,
            valid_paths_count: summary.valid_paths_count as u64,
            failed_count: summary.failed_count as u64,
            skipped_recent_count: summary.skipped_recent_count as u64,
            failed_collaborators: summary.failed_collaborators,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepairRes {
    pub fixed_count: u64,
    pub orphaned_count: u64,
    pub failed_count: u64,
}

impl From<RepairSummary> for RepairRes {
    fn from(summary: RepairSummary) -> Self {
        Self {
            fixed_count: summary.fixed_count as u64,
            orphaned_count: summary.orphaned_count as u64,
            failed_count: summary.failed_count as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_res_wire_names() {
        let res: CleanupRes = CleanupSummary {
            deleted_count: 2,
            valid_paths_count: 5,
            ..CleanupSummary::default()
        }
        .into();

        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["deletedCount"], 2);
        assert_eq!(json["validPathsCount"], 5);
        assert_eq!(json["skippedRecentCount"], 0);
    }

    #[test]
    fn test_upload_res_from_asset() {
        let res = UploadRes::from(UploadedAsset {
            filename: "logo-1-0a1b2c3d.webp".into(),
            relative_path: "banks/logo-1-0a1b2c3d.webp".into(),
            url: "/uploads/banks/logo-1-0a1b2c3d.webp".into(),
            byte_size: 10,
            original_byte_size: 100,
            mime_type: "image/webp".into(),
            width: 300,
            height: 300,
        });

        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["originalByteSize"], 100);
        assert_eq!(json["relativePath"], "banks/logo-1-0a1b2c3d.webp");
    }

    fn file_info(relative_path: &str) -> FileInfo {
        let at = chrono::DateTime::parse_from_rfc3339("2025-10-16T08:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        FileInfo {
            relative_path: media_types::NonEmptyText::new(relative_path).unwrap(),
            size_bytes: 2048,
            width: Some(300),
            height: Some(150),
            media_type: media_types::NonEmptyText::new("image/webp").ok(),
            created_at: at,
            modified_at: at,
        }
    }

    #[test]
    fn test_file_info_res_upload_time() {
        let named = FileInfoRes::from(file_info("banks/logo-1760601234567-0a1b2c3d.webp"));
        let json = serde_json::to_value(&named).unwrap();
        assert_eq!(json["uploadedAt"], "2025-10-16T07:53:54.567+00:00");
        assert_eq!(json["modifiedAt"], "2025-10-16T08:00:00+00:00");

        let copied = FileInfoRes::from(file_info("gallery/holiday.jpg"));
        assert_eq!(copied.uploaded_at, None);
    }
}

//! Upload options, category presets and upload results.

use crate::transcode::{OutputFormat, TranscodeOptions};
use chrono::{DateTime, Utc};
use media_naming::AssetName;
use serde::Serialize;

/// Target bounds for the known categories.
///
/// Logos are small and square; gallery and school images are landscape.
pub fn preset_for(subdirectory: &str) -> Option<(u32, u32)> {
    match subdirectory {
        "banks" | "sponsors" => Some((300, 300)),
        "gallery" | "schools" => Some((1200, 800)),
        "alerts" => Some((1200, 1200)),
        _ => None,
    }
}

/// Caller options for a single upload.
///
/// Unset dimensions come from the subdirectory preset, then from the transcoder defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadOptions {
    pub prefix: String,
    pub subdirectory: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<OutputFormat>,
    pub quality: Option<u8>,
}

impl UploadOptions {
    pub fn new(subdirectory: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            subdirectory: subdirectory.into(),
            width: None,
            height: None,
            format: None,
            quality: None,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Resolves the effective transcode settings.
    pub fn transcode_options(&self) -> TranscodeOptions {
        let defaults = TranscodeOptions::default();
        let (preset_w, preset_h) = preset_for(self.subdirectory.trim_matches('/'))
            .unwrap_or((defaults.width, defaults.height));

        TranscodeOptions {
            width: self.width.unwrap_or(preset_w),
            height: self.height.unwrap_or(preset_h),
            quality: self.quality.unwrap_or(defaults.quality),
            format: self.format.unwrap_or(defaults.format),
        }
    }
}

/// A stored upload, ready to be written into a record field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedAsset {
    pub filename: String,
    /// `<subdirectory>/<filename>`, the value to store in the record
    pub relative_path: String,
    pub url: String,
    pub byte_size: u64,
    pub original_byte_size: u64,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedUpload {
    pub filename: String,
    pub error: String,
}

/// Batch result: each file succeeds or fails independently.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUploadOutcome {
    pub succeeded: Vec<UploadedAsset>,
    pub failed: Vec<FailedUpload>,
}

/// Upload time encoded in a stored file's name.
///
/// `None` for files whose name does not follow the `{prefix}-{millis}-{hex}{ext}` layout, such
/// as files copied into the upload root by hand.
pub fn uploaded_at(relative_path: &str) -> Option<DateTime<Utc>> {
    let filename = relative_path.rsplit('/').next()?;
    filename.parse::<AssetName>().ok().map(|name| name.timestamp())
}

//! Upload validation.
//!
//! The validator looks only at what the client declared: byte size and MIME type. It does not
//! sniff content; a mislabelled file passes here and is rejected by the transcoder instead.

use crate::constants::{ALLOWED_MIME_TYPES, DEFAULT_MAX_UPLOAD_BYTES};
use crate::ValidationError;

/// An uploaded file as received from a client.
#[derive(Clone, Debug)]
pub struct UploadFile {
    original_filename: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(
        original_filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            original_filename: original_filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    /// Declared MIME type as sent by the client.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Size and type gate applied before any processing.
#[derive(Clone, Debug)]
pub struct Validator {
    max_bytes: u64,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UPLOAD_BYTES)
    }
}

impl Validator {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Checks an upload against the size limit and MIME allow-list.
    ///
    /// # Errors
    ///
    /// - `MissingFile` if `file` is `None`
    /// - `TooLarge` if the size exceeds the configured maximum
    /// - `UnsupportedType` if the declared MIME type is not JPEG, PNG, GIF or WebP
    pub fn validate(&self, file: Option<&UploadFile>) -> Result<(), ValidationError> {
        let file = file.ok_or(ValidationError::MissingFile)?;

        if file.size() > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size: file.size(),
                max: self.max_bytes,
            });
        }

        if !is_allowed_mime(file.mime_type()) {
            return Err(ValidationError::UnsupportedType {
                mime: file.mime_type().to_string(),
                allowed: ALLOWED_MIME_TYPES.join(", "),
            });
        }

        Ok(())
    }
}

/// Compares the essence of a MIME type (parameters stripped, case-insensitive).
fn is_allowed_mime(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    ALLOWED_MIME_TYPES.contains(&essence.as_str())
}

use media_files::FilesError;
use media_naming::NamingError;

/// Rejections raised before any byte of an upload is processed.
///
/// Messages name the violated constraint so they can be shown to administrators as-is.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("no file was provided")]
    MissingFile,
    #[error("file is {size} bytes; maximum upload size is {} MiB", format_mib(.max))]
    TooLarge { size: u64, max: u64 },
    #[error("unsupported file type '{mime}'; allowed types: {allowed}")]
    UnsupportedType { mime: String, allowed: String },
}

fn format_mib(bytes: &u64) -> String {
    let mib = *bytes as f64 / (1024.0 * 1024.0);
    let text = format!("{:.2}", mib);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Failures reported by an entity collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("query failed: {0}")]
    Query(String),
    #[error("record not found: {0}")]
    RecordNotFound(String),
    #[error("failed to access record file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed record file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("image processing failed: {0}")]
    Processing(String),
    #[error("storage error: {0}")]
    Storage(#[from] FilesError),
    #[error("naming error: {0}")]
    Naming(#[from] NamingError),
    #[error("collaborator '{collaborator}' failed: {source}")]
    Collaborator {
        collaborator: String,
        #[source]
        source: CollaboratorError,
    },
    #[error("failed to read config file: {0}")]
    ConfigRead(std::io::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
}

impl MediaError {
    /// True for errors the uploader can fix by sending a different file or options.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            MediaError::InvalidInput(_)
                | MediaError::Validation(_)
                | MediaError::Processing(_)
                | MediaError::Naming(_)
                | MediaError::Storage(FilesError::InvalidPath(_))
        )
    }
}

pub type MediaResult<T> = std::result::Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_large_message_names_limit_in_mib() {
        let err = ValidationError::TooLarge {
            size: 10 * 1024 * 1024,
            max: 5 * 1024 * 1024,
        };
        assert_eq!(
            err.to_string(),
            "file is 10485760 bytes; maximum upload size is 5 MiB"
        );
    }

    #[test]
    fn test_format_mib_fractional() {
        assert_eq!(format_mib(&(1536 * 1024)), "1.5");
    }

    #[test]
    fn test_user_error_classification() {
        assert!(MediaError::Processing("bad".into()).is_user_error());
        assert!(!MediaError::Storage(FilesError::Io(std::io::Error::other("disk"))).is_user_error());
    }
}

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use media_core::{FilesError, MediaError, ValidationError};

pub(crate) type ApiError = (StatusCode, String);

/// Maps a core error to a status code and message.
///
/// User-correctable errors carry their message; operational errors are logged and hidden.
pub(crate) fn media_error(e: MediaError) -> ApiError {
    let status = match &e {
        MediaError::Validation(ValidationError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
        MediaError::Validation(ValidationError::UnsupportedType { .. }) => {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        MediaError::Validation(ValidationError::MissingFile)
        | MediaError::InvalidInput(_)
        | MediaError::Processing(_)
        | MediaError::Naming(_)
        | MediaError::Storage(FilesError::InvalidPath(_)) => StatusCode::BAD_REQUEST,
        _ => {
            tracing::error!("Media operation error: {:?}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into());
        }
    };
    (status, e.to_string())
}

pub(crate) fn multipart_error(e: MultipartError) -> ApiError {
    tracing::debug!("Multipart error: {}", e);
    (e.status(), e.body_text())
}

pub(crate) fn join_error(e: tokio::task::JoinError) -> ApiError {
    tracing::error!("Blocking task failed: {:?}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let too_large = MediaError::Validation(ValidationError::TooLarge { size: 10, max: 5 });
        assert_eq!(media_error(too_large).0, StatusCode::PAYLOAD_TOO_LARGE);

        let unsupported = MediaError::Validation(ValidationError::UnsupportedType {
            mime: "text/plain".into(),
            allowed: "image/png".into(),
        });
        assert_eq!(media_error(unsupported).0, StatusCode::UNSUPPORTED_MEDIA_TYPE);

        assert_eq!(
            media_error(MediaError::Processing("corrupt".into())).0,
            StatusCode::BAD_REQUEST
        );

        let io = MediaError::Storage(FilesError::Io(std::io::Error::other("disk full")));
        let (status, message) = media_error(io);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("disk full"));
    }
}

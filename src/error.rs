//! Error types for genmedia.

use thiserror::Error;

/// Common error type for genmedia.
#[derive(Error, Debug)]
pub enum MediaError {
    /// No file payload was attached to an upload, or the transfer failed.
    #[error("no file was transmitted: {0}")]
    NoFileTransmitted(String),

    /// A remote reference that is not a usable URL.
    #[error("invalid media reference: {0}")]
    InvalidReference(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// The storage backend failed while writing an upload.
    ///
    /// The caller is expected to tell the user and allow a retry.
    #[error("failed to write media file: {0}")]
    WriteFailed(String),

    /// The storage backend or metadata store could not be enumerated.
    #[error("media storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Raw storage backend failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// A path that escapes its storage root.
    #[error("invalid storage path: {0}")]
    InvalidPath(String),

    /// Database error.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

// Conversion from sqlx errors
impl From<sqlx::Error> for MediaError {
    fn from(e: sqlx::Error) -> Self {
        MediaError::Database(e.to_string())
    }
}

/// Result type alias for genmedia operations.
pub type Result<T> = std::result::Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_file_error_display() {
        let err = MediaError::NoFileTransmitted("upload was interrupted".to_string());
        assert_eq!(
            err.to_string(),
            "no file was transmitted: upload was interrupted"
        );
    }

    #[test]
    fn test_not_found_error_display() {
        let err = MediaError::NotFound("media file photos/a.jpg".to_string());
        assert_eq!(err.to_string(), "media file photos/a.jpg not found");
    }

    #[test]
    fn test_write_failed_error_display() {
        let err = MediaError::WriteFailed("disk full".to_string());
        assert_eq!(err.to_string(), "failed to write media file: disk full");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MediaError = io_err.into();
        assert!(matches!(err, MediaError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: MediaError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, MediaError::Database(_)));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(MediaError::InvalidReference("ftp:/broken".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}

//! Storage engine error types.
//!
//! Defines [`StorageError`], the domain error enum for every failure the
//! engine can surface. Each variant belongs to one [`ErrorKind`], which in
//! turn maps to an HTTP status code and a short reason string through
//! [`StorageError::status_code`] and [`StorageError::reason`], so the request
//! layer can translate engine failures without matching on every variant.
//!
//! # Usage
//!
//! ```
//! use gcstack_storage_core::error::{ErrorKind, StorageError};
//!
//! let err = StorageError::NoSuchBucket {
//!     bucket: "my-bucket".to_owned(),
//! };
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//! assert_eq!(err.status_code(), 404);
//! ```

use std::fmt;

/// Coarse classification of a [`StorageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A bucket, object or upload session does not exist.
    NotFound,
    /// The operation conflicts with the current catalog state.
    Conflict,
    /// Caller-supplied checksums disagree with the received content.
    ChecksumConflict,
    /// The request carried a malformed argument.
    InvalidArgument,
    /// I/O, serialization or other unexpected failure.
    Internal,
}

impl ErrorKind {
    /// Return the canonical string representation of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::ChecksumConflict => "ChecksumConflict",
            Self::InvalidArgument => "InvalidArgument",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage engine error type.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    // -----------------------------------------------------------------------
    // Not found
    // -----------------------------------------------------------------------
    /// The specified bucket does not exist.
    #[error("Bucket with name '{bucket}' does not exist")]
    NoSuchBucket {
        /// The bucket name that was not found.
        bucket: String,
    },

    /// The specified object does not exist.
    #[error("Object with name '{key}' does not exist in bucket '{bucket}'")]
    NoSuchObject {
        /// The bucket that was searched.
        bucket: String,
        /// The object key that was not found.
        key: String,
    },

    /// The resumable upload session does not exist.
    #[error("No such upload session: {upload_id}")]
    NoSuchUpload {
        /// The session ID that was not found.
        upload_id: String,
    },

    /// The multipart upload does not exist.
    #[error("No such multipart upload: {upload_id}")]
    NoSuchMultipartUpload {
        /// The upload ID that was not found.
        upload_id: String,
    },

    // -----------------------------------------------------------------------
    // Conflicts
    // -----------------------------------------------------------------------
    /// The bucket still contains objects.
    #[error("Bucket '{bucket}' is not empty")]
    BucketNotEmpty {
        /// The bucket that is not empty.
        bucket: String,
    },

    /// A resumable upload session still targets the bucket.
    #[error("Bucket '{bucket}' has pending upload sessions")]
    BucketHasPendingUploads {
        /// The bucket with pending sessions.
        bucket: String,
    },

    // -----------------------------------------------------------------------
    // Checksum conflicts
    // -----------------------------------------------------------------------
    /// The supplied CRC32C does not match the content.
    #[error("Provided CRC32C \"{provided}\" doesn't match calculated CRC32C \"{computed}\".")]
    Crc32cMismatch {
        /// The base64 value supplied by the caller.
        provided: String,
        /// The base64 value computed over the content.
        computed: String,
    },

    /// The supplied MD5 hash does not match the content.
    #[error("Provided MD5 hash \"{provided}\" doesn't match calculated MD5 hash \"{computed}\".")]
    Md5Mismatch {
        /// The base64 value supplied by the caller.
        provided: String,
        /// The base64 value computed over the content.
        computed: String,
    },

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------
    /// An argument provided is invalid.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // -----------------------------------------------------------------------
    // Internal / catch-all
    // -----------------------------------------------------------------------
    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StorageError {
    /// Build an [`StorageError::InvalidArgument`] from anything printable.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoSuchBucket { .. }
            | Self::NoSuchObject { .. }
            | Self::NoSuchUpload { .. }
            | Self::NoSuchMultipartUpload { .. } => ErrorKind::NotFound,
            Self::BucketNotEmpty { .. } | Self::BucketHasPendingUploads { .. } => {
                ErrorKind::Conflict
            }
            Self::Crc32cMismatch { .. } | Self::Md5Mismatch { .. } => ErrorKind::ChecksumConflict,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error means the addressed resource is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// HTTP status code the request layer should answer with.
    ///
    /// Conflicts are reported as `400` with a structured body, matching the
    /// behaviour of the real service for non-empty bucket deletion.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict | ErrorKind::ChecksumConflict | ErrorKind::InvalidArgument => 400,
            ErrorKind::Internal => 500,
        }
    }

    /// Short machine-readable reason used in JSON error bodies.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NotFound => "notFound",
            ErrorKind::Conflict => "conflict",
            ErrorKind::ChecksumConflict | ErrorKind::InvalidArgument => "invalid",
            ErrorKind::Internal => "internalError",
        }
    }
}

/// Convenience result type for storage engine operations.
pub type StorageResult<T> = Result<T, StorageError>;

//! Validation for bucket names and object keys.
//!
//! Follows the naming rules of the cloud service closely enough that the
//! reserved transient containers (`_resumable`, `_multipart`) can never be
//! claimed by a bucket.

use crate::error::{StorageError, StorageResult};

/// Minimum bucket name length.
const MIN_BUCKET_NAME_LEN: usize = 3;

/// Maximum bucket name length (names containing dots).
const MAX_BUCKET_NAME_LEN: usize = 222;

/// Maximum object key length in bytes.
const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Validate a bucket name.
///
/// Names are 3-222 characters of lowercase letters, digits, `-`, `_` and
/// `.`, starting and ending with a letter or digit.
///
/// # Examples
///
/// ```
/// use gcstack_storage_core::validation::validate_bucket_name;
///
/// assert!(validate_bucket_name("my-bucket").is_ok());
/// assert!(validate_bucket_name("_resumable").is_err());
/// ```
pub fn validate_bucket_name(name: &str) -> StorageResult<()> {
    let invalid = |reason: &str| {
        StorageError::invalid_argument(format!("invalid bucket name '{name}': {reason}"))
    };

    if !(MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&name.len()) {
        return Err(invalid(&format!(
            "must be between {MIN_BUCKET_NAME_LEN} and {MAX_BUCKET_NAME_LEN} characters long"
        )));
    }

    if !name.bytes().all(|b| {
        b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_' || b == b'.'
    }) {
        return Err(invalid(
            "must only contain lowercase letters, numbers, dashes, underscores and dots",
        ));
    }

    let bytes = name.as_bytes();
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !alnum(bytes[0]) || !alnum(bytes[bytes.len() - 1]) {
        return Err(invalid("must start and end with a letter or number"));
    }

    if name.contains("..") {
        return Err(invalid("must not contain consecutive dots"));
    }

    Ok(())
}

/// Validate an object key.
///
/// Keys are 1-1024 bytes of UTF-8 without carriage returns or line feeds.
pub fn validate_object_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
        return Err(StorageError::invalid_argument(format!(
            "object name must be between 1 and {MAX_OBJECT_KEY_LEN} bytes long"
        )));
    }
    if key.contains(['\r', '\n']) {
        return Err(StorageError::invalid_argument(
            "object name must not contain carriage return or line feed characters",
        ));
    }
    Ok(())
}

//! Content checksums and integrity validation.
//!
//! Every write path runs [`compute_and_reconcile`] over the final bytes
//! before anything is committed. Digests are reported the way the cloud API
//! reports them: base64 of the raw MD5 digest and base64 of the big-endian
//! CRC-32C value.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use digest::Digest;

use crate::error::{StorageError, StorageResult};
use crate::state::ObjectResource;

// ---------------------------------------------------------------------------
// Digests
// ---------------------------------------------------------------------------

/// Compute the base64-encoded CRC-32C (Castagnoli) of `data`.
///
/// # Examples
///
/// ```
/// use gcstack_storage_core::checksums::compute_crc32c;
///
/// assert_eq!(compute_crc32c(b"hello world"), "yZRlqg==");
/// ```
#[must_use]
pub fn compute_crc32c(data: &[u8]) -> String {
    BASE64_STANDARD.encode(crc32c::crc32c(data).to_be_bytes())
}

/// Compute the base64-encoded MD5 digest of `data`.
///
/// # Examples
///
/// ```
/// use gcstack_storage_core::checksums::compute_md5;
///
/// assert_eq!(compute_md5(b"hello world"), "XrY7u+Ae7tCTyyK7j1rNww==");
/// ```
#[must_use]
pub fn compute_md5(data: &[u8]) -> String {
    BASE64_STANDARD.encode(md5::Md5::digest(data))
}

/// Compute the hex-encoded MD5 digest of `data`.
#[must_use]
pub fn compute_md5_hex(data: &[u8]) -> String {
    hex::encode(md5::Md5::digest(data))
}

/// Quoted hex MD5, the ETag returned for a single multipart part.
#[must_use]
pub fn part_etag(data: &[u8]) -> String {
    format!("\"{}\"", compute_md5_hex(data))
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Fill in or verify the checksums carried by `resource` against `content`.
///
/// Absent or empty `crc32c`/`md5Hash` fields are set to the computed values;
/// other ones must match. A missing or empty `etag` becomes the content MD5.
///
/// # Errors
///
/// Returns [`StorageError::Crc32cMismatch`] or [`StorageError::Md5Mismatch`]
/// when a supplied value disagrees with the content. The resource is left
/// untouched in that case.
pub fn compute_and_reconcile(content: &[u8], resource: &mut ObjectResource) -> StorageResult<()> {
    let crc32c = compute_crc32c(content);
    let md5 = compute_md5(content);

    if let Some(provided) = resource.crc32c.as_ref().filter(|v| !v.is_empty()) {
        if *provided != crc32c {
            return Err(StorageError::Crc32cMismatch {
                provided: provided.clone(),
                computed: crc32c,
            });
        }
    }
    if let Some(provided) = resource.md5_hash.as_ref().filter(|v| !v.is_empty()) {
        if *provided != md5 {
            return Err(StorageError::Md5Mismatch {
                provided: provided.clone(),
                computed: md5,
            });
        }
    }

    if resource.etag.as_deref().is_none_or(str::is_empty) {
        resource.etag = Some(md5.clone());
    }
    resource.crc32c = Some(crc32c);
    resource.md5_hash = Some(md5);
    Ok(())
}

/// Value of the download hash header, e.g. `crc32c=yZRlqg==,md5=XrY7...`.
///
/// Only the digests present on the resource are included.
#[must_use]
pub fn hash_header(resource: &ObjectResource) -> String {
    let mut parts = Vec::with_capacity(2);
    if let Some(crc32c) = &resource.crc32c {
        parts.push(format!("crc32c={crc32c}"));
    }
    if let Some(md5) = &resource.md5_hash {
        parts.push(format!("md5={md5}"));
    }
    parts.join(",")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Utility functions for the storage engine.
//!
//! Session id generation, timestamps, and parsing of the two range headers
//! the upload and download paths understand.

use chrono::{SecondsFormat, Utc};
use digest::Digest;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

// ---------------------------------------------------------------------------
// ID generation
// ---------------------------------------------------------------------------

/// Generate an upload session id for `bucket`/`key`.
///
/// The id embeds the target and a nanosecond creation timestamp, followed
/// by a short random suffix so that sessions created within the same clock
/// tick never collide.
///
/// # Examples
///
/// ```
/// use gcstack_storage_core::utils::generate_session_id;
///
/// let id = generate_session_id("bucket", "dir/file.txt");
/// assert!(id.starts_with("bucket:dir/file.txt:"));
/// assert_ne!(id, generate_session_id("bucket", "dir/file.txt"));
/// ```
#[must_use]
pub fn generate_session_id(bucket: &str, key: &str) -> String {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.9f");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{bucket}:{key}:{now}:{}", &suffix[..8])
}

/// Map an arbitrary session id to a filesystem-safe content-store key.
///
/// # Examples
///
/// ```
/// use gcstack_storage_core::utils::safe_id;
///
/// let id = safe_id("bucket:a/b:2024");
/// assert_eq!(id.len(), 64);
/// assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
#[must_use]
pub fn safe_id(id: &str) -> String {
    hex::encode(sha2::Sha256::digest(id.as_bytes()))
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Current UTC time as RFC 3339 with microseconds and a `Z` suffix.
///
/// # Examples
///
/// ```
/// use gcstack_storage_core::utils::timestamp_now;
///
/// let ts = timestamp_now();
/// assert!(ts.ends_with('Z'));
/// assert!(ts.contains('T'));
/// ```
#[must_use]
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current Unix time in whole seconds.
#[must_use]
pub fn unix_seconds() -> i64 {
    Utc::now().timestamp()
}

// ---------------------------------------------------------------------------
// Range parsing
// ---------------------------------------------------------------------------

/// A parsed `Content-Range: bytes start-end/total` descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// First byte offset of the chunk.
    pub start: u64,
    /// Last byte offset of the chunk, inclusive.
    pub end: u64,
    /// Declared total object size.
    pub total: u64,
}

/// Parse a resumable chunk descriptor of the form `bytes start-end/total`.
///
/// Leading whitespace is tolerated. Anything else, including the
/// `bytes */total` and `bytes start-end/*` forms, yields `None`; callers
/// treat such requests as a single final chunk.
///
/// # Examples
///
/// ```
/// use gcstack_storage_core::utils::parse_content_range;
///
/// let range = parse_content_range("bytes 0-3/10").unwrap();
/// assert_eq!((range.start, range.end, range.total), (0, 3, 10));
/// assert!(parse_content_range("bytes */10").is_none());
/// ```
#[must_use]
pub fn parse_content_range(header: &str) -> Option<ContentRange> {
    let rest = header.trim_start().strip_prefix("bytes ")?;
    let (span, total) = rest.split_once('/')?;
    let (start, end) = span.split_once('-')?;
    Some(ContentRange {
        start: parse_digits(start)?,
        end: parse_digits(end)?,
        total: parse_digits(total)?,
    })
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parse a download `Range: bytes=start-end` header against `size` bytes.
///
/// Accepts `bytes=N-M` and `bytes=N-`; the end is clamped to the last byte.
/// Returns the inclusive `(start, end)` pair.
///
/// # Errors
///
/// Returns [`StorageError::InvalidArgument`] if the header is malformed or
/// the range cannot be satisfied.
///
/// # Examples
///
/// ```
/// use gcstack_storage_core::utils::parse_byte_range;
///
/// assert_eq!(parse_byte_range("bytes=2-100", 10).unwrap(), (2, 9));
/// assert_eq!(parse_byte_range("bytes=4-", 10).unwrap(), (4, 9));
/// ```
pub fn parse_byte_range(header: &str, size: u64) -> StorageResult<(u64, u64)> {
    let invalid = || StorageError::invalid_argument(format!("unsatisfiable range: {header}"));

    let range = header.trim().strip_prefix("bytes=").ok_or_else(invalid)?;
    let (start, end) = range.split_once('-').ok_or_else(invalid)?;
    let start = parse_digits(start).ok_or_else(invalid)?;
    if start >= size {
        return Err(invalid());
    }

    let last = size - 1;
    let end = if end.is_empty() {
        last
    } else {
        parse_digits(end).ok_or_else(invalid)?.min(last)
    };
    if start > end {
        return Err(invalid());
    }
    Ok((start, end))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

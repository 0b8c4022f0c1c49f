//! Resumable (chunked) uploads.
//!
//! A session accumulates chunks in the `_resumable` container until the
//! buffered length reaches the total declared in the chunk's
//! `Content-Range`. The completing chunk truncates the buffer to exactly
//! that total, validates checksums and materializes the object, retiring
//! the session in the same catalog mutation.

use bytes::Bytes;
use tracing::debug;

use crate::checksums::compute_and_reconcile;
use crate::error::{StorageError, StorageResult};
use crate::provider::StorageEngine;
use crate::state::{ObjectPatch, ObjectResource, ResumableUpload};
use crate::utils::parse_content_range;
use crate::validation::validate_object_key;

/// Content type used when a session is started without one.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Result of sending one chunk to a resumable session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// More bytes are expected. `persisted_end` is the last stored byte
    /// offset, or `None` when nothing is stored yet.
    Incomplete {
        /// Last stored byte offset, inclusive.
        persisted_end: Option<u64>,
    },
    /// The session completed and the object now exists.
    Complete(ObjectResource),
}

impl ChunkOutcome {
    /// Value for the `Range` header of a partial-progress response, e.g.
    /// `bytes=0-3`.
    #[must_use]
    pub fn range_header(&self) -> Option<String> {
        match self {
            Self::Incomplete {
                persisted_end: Some(end),
            } => Some(format!("bytes=0-{end}")),
            _ => None,
        }
    }
}

impl StorageEngine {
    /// Open a resumable session for `bucket/key`.
    ///
    /// `declared_size` is recorded on the skeleton until completion sets the
    /// real size.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoSuchBucket`] if the bucket does not exist and
    /// [`StorageError::InvalidArgument`] for an invalid key.
    pub fn start_resumable(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
        declared_size: Option<u64>,
        metadata: Option<&ObjectPatch>,
    ) -> StorageResult<String> {
        validate_object_key(key)?;
        let resource = self.new_object_resource(
            bucket,
            key,
            Some(content_type.unwrap_or(DEFAULT_CONTENT_TYPE)),
            declared_size.unwrap_or(0),
            metadata,
        );
        self.catalog.create_resumable(resource, declared_size)
    }

    /// Send one chunk to a session.
    ///
    /// With a parseable `bytes start-end/total` range the chunk is appended
    /// to the session buffer. Otherwise `chunk` is taken as the complete
    /// content.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NoSuchUpload`] if the session is unknown.
    /// - A checksum mismatch against values supplied when the session was
    ///   started; the session is kept.
    /// - [`StorageError::NoSuchBucket`] if the bucket was deleted meanwhile.
    pub fn upload_chunk(
        &self,
        upload_id: &str,
        content_range: Option<&str>,
        chunk: &[u8],
    ) -> StorageResult<ChunkOutcome> {
        let (session, content) = match content_range.and_then(parse_content_range) {
            Some(range) => {
                let (session, buffer) = self.catalog.append_resumable(upload_id, chunk)?;
                let received = buffer.len() as u64;
                if received < range.total {
                    debug!(upload_id, received, total = range.total, "resumable upload incomplete");
                    return Ok(ChunkOutcome::Incomplete {
                        persisted_end: received.checked_sub(1),
                    });
                }
                let total = usize::try_from(range.total).map_err(|_| {
                    StorageError::invalid_argument(format!(
                        "declared size {} out of range",
                        range.total
                    ))
                })?;
                (session, buffer.slice(..total))
            }
            None => {
                let session = self.catalog.get_resumable(upload_id)?;
                (session, Bytes::copy_from_slice(chunk))
            }
        };

        let ResumableUpload { mut resource, .. } = session;
        resource.size = content.len() as u64;
        compute_and_reconcile(&content, &mut resource)?;
        let bucket = resource.bucket.clone();
        let key = resource.name.clone();
        let created = self
            .catalog
            .create_object(&bucket, &key, &content, resource, Some(upload_id))?;
        Ok(ChunkOutcome::Complete(created))
    }

    /// Look up a resumable session.
    pub fn resumable_session(&self, upload_id: &str) -> StorageResult<ResumableUpload> {
        self.catalog.get_resumable(upload_id)
    }

    /// Abandon a resumable session and drop its buffered bytes.
    pub fn cancel_resumable(&self, upload_id: &str) -> StorageResult<()> {
        self.catalog.delete_resumable(upload_id)
    }
}

//! In-flight upload session records.
//!
//! Both session kinds keep only metadata in the catalog. Their bytes live in
//! the content store under the reserved `_resumable` and `_multipart`
//! containers, addressed through [`crate::utils::safe_id`].

use serde::{Deserialize, Serialize};

use crate::state::ObjectResource;
use crate::utils::safe_id;

/// Highest part number a multipart upload accepts.
pub const MAX_PART_NUMBER: u32 = 10_000;

/// A chunked upload that completes once the declared total size arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumableUpload {
    /// Session identifier handed back to the client.
    pub upload_id: String,
    /// Skeleton of the object the session will create.
    pub resource: ObjectResource,
    /// Total size announced at initiation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_size: Option<u64>,
    /// Bytes buffered so far.
    #[serde(default)]
    pub received: u64,
    /// When the session was created (RFC 3339).
    pub initiated: String,
}

impl ResumableUpload {
    /// Bucket this session writes into.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.resource.bucket
    }

    /// Object key this session writes.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.resource.name
    }

    /// Content-store key of the chunk buffer.
    #[must_use]
    pub fn buffer_key(&self) -> String {
        safe_id(&self.upload_id)
    }
}

/// An assemble-on-complete upload made of independently stored parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartUpload {
    /// Upload identifier handed back to the client.
    pub upload_id: String,
    /// Skeleton of the object the upload will create, including content
    /// type and custom metadata.
    pub resource: ObjectResource,
    /// When the upload was created (RFC 3339).
    pub initiated: String,
}

impl MultipartUpload {
    /// Bucket this upload writes into.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.resource.bucket
    }

    /// Object key this upload writes.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.resource.name
    }

    /// Content-store key of one part, `<safe id>.<part:05>`.
    #[must_use]
    pub fn part_key(&self, part_number: u32) -> String {
        part_key(&self.upload_id, part_number)
    }
}

/// Content-store key of a multipart part.
#[must_use]
pub fn part_key(upload_id: &str, part_number: u32) -> String {
    format!("{}.{part_number:05}", safe_id(upload_id))
}

//! Object operations: direct upload, read, patch, delete, list, copy and
//! compose.
//!
//! Every path that creates an object builds a fresh skeleton, runs
//! [`compute_and_reconcile`] over the final bytes and only then hands both
//! to the catalog, so a checksum conflict never leaves anything behind.

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::checksums::{compute_and_reconcile, hash_header};
use crate::error::{StorageError, StorageResult};
use crate::listing::ListResult;
use crate::provider::StorageEngine;
use crate::state::{ObjectPatch, ObjectResource};
use crate::utils::parse_byte_range;
use crate::validation::validate_object_key;

/// A slice of an object's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRange {
    /// The resource the bytes belong to.
    pub resource: ObjectResource,
    /// Bytes `start..=end`.
    pub data: Bytes,
    /// First byte offset.
    pub start: u64,
    /// Last byte offset, inclusive.
    pub end: u64,
    /// Full object size.
    pub total: u64,
}

impl ObjectRange {
    /// Value for a `Content-Range` response header.
    #[must_use]
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// Outcome of a rewrite, shaped like the API's rewrite response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteResponse {
    /// Always `storage#rewriteResponse`.
    pub kind: String,
    /// Bytes copied so far.
    #[serde(with = "crate::state::object::string_u64")]
    pub total_bytes_rewritten: u64,
    /// Size of the destination object.
    #[serde(with = "crate::state::object::string_u64")]
    pub object_size: u64,
    /// Whether the rewrite finished. Always `true`; rewrites happen in one
    /// step.
    pub done: bool,
    /// The destination object.
    pub resource: ObjectResource,
}

impl StorageEngine {
    /// Validate checksums for `content` and install it at `bucket/key`.
    fn commit(
        &self,
        bucket: &str,
        key: &str,
        content: &[u8],
        mut resource: ObjectResource,
    ) -> StorageResult<ObjectResource> {
        resource.size = content.len() as u64;
        compute_and_reconcile(content, &mut resource)?;
        self.catalog.create_object(bucket, key, content, resource, None)
    }

    /// Single-request upload.
    ///
    /// `metadata` may carry expected `crc32c`/`md5Hash` values, which are
    /// verified against `content`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NoSuchBucket`] if the bucket does not exist.
    /// - [`StorageError::Crc32cMismatch`] / [`StorageError::Md5Mismatch`]
    ///   if supplied checksums are wrong; nothing is written.
    /// - [`StorageError::InvalidArgument`] for an invalid key.
    pub fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        content: &[u8],
        content_type: Option<&str>,
        metadata: Option<&ObjectPatch>,
    ) -> StorageResult<ObjectResource> {
        validate_object_key(key)?;
        let resource =
            self.new_object_resource(bucket, key, content_type, content.len() as u64, metadata);
        self.commit(bucket, key, content, resource)
    }

    /// Look up an object's resource.
    pub fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectResource> {
        self.catalog.get_object(bucket, key)
    }

    /// Read an object's full content.
    pub fn read_object(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        self.catalog.get_object_bytes(bucket, key)
    }

    /// Read the slice of an object selected by a `Range: bytes=start-end`
    /// header.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for a missing object and
    /// [`StorageError::InvalidArgument`] for an unsatisfiable range.
    pub fn read_object_range(
        &self,
        bucket: &str,
        key: &str,
        range_header: &str,
    ) -> StorageResult<ObjectRange> {
        let (resource, content) = self.catalog.get_object_with_content(bucket, key)?;
        let total = content.len() as u64;
        let (start, end) = parse_byte_range(range_header, total)?;
        let (lo, hi) = (to_index(start)?, to_index(end)?);
        Ok(ObjectRange {
            resource,
            data: content.slice(lo..=hi),
            start,
            end,
            total,
        })
    }

    /// Value of the hash header sent with full downloads.
    #[must_use]
    pub fn hash_header(&self, resource: &ObjectResource) -> String {
        hash_header(resource)
    }

    /// Apply a metadata patch to an existing object.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the bucket or object does not exist.
    pub fn patch_object(
        &self,
        bucket: &str,
        key: &str,
        patch: &ObjectPatch,
    ) -> StorageResult<ObjectResource> {
        self.catalog.get_object(bucket, key)?;
        self.catalog
            .patch_object(bucket, key, patch)?
            .ok_or_else(|| StorageError::NoSuchObject {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            })
    }

    /// Delete an object.
    pub fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.catalog.delete_object(bucket, key)
    }

    /// List a bucket with optional prefix and delimiter.
    pub fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        delimiter: Option<&str>,
    ) -> StorageResult<ListResult> {
        self.catalog.list_objects(bucket, prefix, delimiter)
    }

    /// Copy an object, carrying its writable metadata to the destination.
    ///
    /// The destination gets a new generation; checksums are revalidated over
    /// the copied bytes.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the source object or the destination
    /// bucket does not exist.
    pub fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StorageResult<ObjectResource> {
        validate_object_key(dst_key)?;
        let (source, content) = self.catalog.get_object_with_content(src_bucket, src_key)?;
        let resource = self.new_object_resource(
            dst_bucket,
            dst_key,
            source.content_type.as_deref(),
            source.size,
            Some(&source.writable_fields()),
        );
        let copied = self.commit(dst_bucket, dst_key, &content, resource)?;
        debug!(src_bucket, src_key, dst_bucket, dst_key, "object copied");
        Ok(copied)
    }

    /// Copy an object and report the result as a completed rewrite.
    ///
    /// # Errors
    ///
    /// Same as [`StorageEngine::copy_object`].
    pub fn rewrite_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StorageResult<RewriteResponse> {
        let resource = self.copy_object(src_bucket, src_key, dst_bucket, dst_key)?;
        Ok(RewriteResponse {
            kind: "storage#rewriteResponse".to_owned(),
            total_bytes_rewritten: resource.size,
            object_size: resource.size,
            done: true,
            resource,
        })
    }

    /// Concatenate `sources` (in order) from `bucket` into `dest_key`.
    ///
    /// The content type comes from the first source; `destination` patches
    /// the new resource.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the bucket or any source is missing,
    /// and [`StorageError::InvalidArgument`] if `sources` is empty.
    pub fn compose_objects(
        &self,
        bucket: &str,
        sources: &[&str],
        dest_key: &str,
        destination: Option<&ObjectPatch>,
    ) -> StorageResult<ObjectResource> {
        validate_object_key(dest_key)?;
        if sources.is_empty() {
            return Err(StorageError::invalid_argument(
                "compose requires at least one source object",
            ));
        }

        let mut content_type = None;
        let mut content = BytesMut::new();
        for (index, source) in sources.iter().enumerate() {
            let (resource, data) = self.catalog.get_object_with_content(bucket, source)?;
            if index == 0 {
                content_type = resource.content_type;
            }
            content.extend_from_slice(&data);
        }

        let resource = self.new_object_resource(
            bucket,
            dest_key,
            content_type.as_deref(),
            content.len() as u64,
            destination,
        );
        let composed = self.commit(bucket, dest_key, &content, resource)?;
        debug!(bucket, dest_key, sources = sources.len(), "objects composed");
        Ok(composed)
    }
}

fn to_index(offset: u64) -> StorageResult<usize> {
    usize::try_from(offset)
        .map_err(|_| StorageError::invalid_argument(format!("offset {offset} out of range")))
}

//! Multipart (assemble-on-complete) uploads.

use crate::checksums::{compute_and_reconcile, part_etag};
use crate::error::StorageResult;
use crate::provider::StorageEngine;
use crate::state::{MultipartUpload, ObjectPatch, ObjectResource};
use crate::validation::validate_object_key;

impl StorageEngine {
    /// Open a multipart upload for `bucket/key`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StorageError::NoSuchBucket`] if the bucket
    /// does not exist.
    pub fn start_multipart(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
        metadata: Option<&ObjectPatch>,
    ) -> StorageResult<String> {
        validate_object_key(key)?;
        let resource = self.new_object_resource(bucket, key, content_type, 0, metadata);
        self.catalog.create_multipart(resource)
    }

    /// Store one part and return its ETag (quoted hex MD5).
    ///
    /// Parts may arrive in any order and from several threads at once;
    /// re-sending a part number replaces it.
    ///
    /// # Errors
    ///
    /// - [`crate::error::StorageError::NoSuchMultipartUpload`] if the upload
    ///   is unknown.
    /// - [`crate::error::StorageError::InvalidArgument`] if `part_number` is
    ///   outside `1..=10000`.
    pub fn upload_part(
        &self,
        upload_id: &str,
        part_number: u32,
        data: &[u8],
    ) -> StorageResult<String> {
        self.catalog.put_part(upload_id, part_number, data)?;
        Ok(part_etag(data))
    }

    /// Concatenate parts `1, 2, ...` up to the first missing number and
    /// materialize the result as the upload's object.
    ///
    /// # Errors
    ///
    /// - [`crate::error::StorageError::NoSuchMultipartUpload`] if the upload
    ///   is unknown.
    /// - A checksum mismatch against values supplied when the upload was
    ///   started; the upload and its parts are kept.
    pub fn complete_multipart(&self, upload_id: &str) -> StorageResult<ObjectResource> {
        let (session, content) = self.catalog.assemble_parts(upload_id)?;
        let MultipartUpload { mut resource, .. } = session;
        resource.size = content.len() as u64;
        compute_and_reconcile(&content, &mut resource)?;
        self.catalog.commit_multipart(upload_id, &content, resource)
    }

    /// Look up a multipart upload.
    pub fn multipart_upload(&self, upload_id: &str) -> StorageResult<MultipartUpload> {
        self.catalog.get_multipart(upload_id)
    }

    /// Drop a multipart upload and every stored part.
    pub fn abort_multipart(&self, upload_id: &str) -> StorageResult<()> {
        self.catalog.abort_multipart(upload_id)
    }
}

//! Bucket operations.

use crate::error::StorageResult;
use crate::provider::StorageEngine;
use crate::state::BucketResource;
use crate::validation::validate_bucket_name;

impl StorageEngine {
    /// Create (or replace) a bucket named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StorageError::InvalidArgument`] for an invalid
    /// name.
    pub fn create_bucket(&self, name: &str, location: Option<&str>) -> StorageResult<BucketResource> {
        validate_bucket_name(name)?;
        let resource = BucketResource::new(name, location, &self.config.default_storage_class);
        self.catalog.create_bucket(resource)
    }

    /// Store a caller-built bucket resource as-is.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StorageError::InvalidArgument`] for an invalid
    /// name.
    pub fn put_bucket(&self, resource: BucketResource) -> StorageResult<BucketResource> {
        validate_bucket_name(&resource.name)?;
        self.catalog.create_bucket(resource)
    }

    /// Look up a bucket.
    pub fn get_bucket(&self, name: &str) -> StorageResult<BucketResource> {
        self.catalog.get_bucket(name)
    }

    /// All buckets, ordered by name.
    #[must_use]
    pub fn list_buckets(&self) -> Vec<BucketResource> {
        self.catalog.list_buckets()
    }

    /// Delete an empty bucket with no pending resumable uploads.
    pub fn delete_bucket(&self, name: &str) -> StorageResult<()> {
        self.catalog.delete_bucket(name)
    }
}

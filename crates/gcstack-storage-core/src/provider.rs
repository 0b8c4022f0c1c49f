//! The storage engine façade.
//!
//! [`StorageEngine`] owns the [`Catalog`] for one storage root together with
//! the configuration. Bucket, object and upload operations are implemented
//! in the [`crate::ops`] submodules as `impl StorageEngine` blocks; the
//! request layer calls them directly.

use std::sync::Arc;

use tracing::info;

use crate::config::StorageConfig;
use crate::error::StorageResult;
use crate::state::{Catalog, ObjectPatch, ObjectResource};
use crate::storage::{ContentStore, DiskStore, MemoryStore};

/// Handle to an opened storage root.
///
/// Cheap to clone; every clone shares the same catalog and content store.
///
/// # Examples
///
/// ```
/// use gcstack_storage_core::StorageEngine;
/// use gcstack_storage_core::config::StorageConfig;
///
/// let config = StorageConfig::builder().in_memory(true).build();
/// let engine = StorageEngine::open(config).unwrap();
/// engine.create_bucket("photos", None).unwrap();
///
/// let obj = engine
///     .upload_object("photos", "cat.jpg", b"meow", Some("image/jpeg"), None)
///     .unwrap();
/// assert_eq!(obj.size, 4);
/// assert_eq!(engine.read_object("photos", "cat.jpg").unwrap().as_ref(), b"meow");
/// ```
#[derive(Debug, Clone)]
pub struct StorageEngine {
    /// Buckets, objects and sessions, bound to the content store.
    pub(crate) catalog: Arc<Catalog>,
    /// Engine configuration.
    pub(crate) config: Arc<StorageConfig>,
}

impl StorageEngine {
    /// Open the storage root described by `config`.
    ///
    /// Selects the in-memory or on-disk content store and loads any existing
    /// catalog snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StorageError::InvalidArgument`] for an invalid
    /// configuration and [`crate::error::StorageError::Internal`] if the
    /// storage root or snapshot cannot be read.
    pub fn open(config: StorageConfig) -> StorageResult<Self> {
        config.validate()?;
        let store: Arc<dyn ContentStore> = if config.in_memory {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(DiskStore::open(config.storage_root())?)
        };
        info!(
            in_memory = config.in_memory,
            root = %config.storage_root().display(),
            "opening storage engine"
        );
        Self::with_store(config, store)
    }

    /// Open an engine over an already constructed content store.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StorageError::Internal`] if the store's
    /// snapshot cannot be parsed.
    pub fn with_store(config: StorageConfig, store: Arc<dyn ContentStore>) -> StorageResult<Self> {
        Ok(Self {
            catalog: Arc::new(Catalog::open(store)?),
            config: Arc::new(config),
        })
    }

    /// Returns a reference to the catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns a reference to the engine configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Build the skeleton resource for a new object at `bucket/key`,
    /// stamped with the configured base URL and storage class.
    ///
    /// `metadata` is merged without bumping `metageneration`.
    #[must_use]
    pub fn new_object_resource(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
        size: u64,
        metadata: Option<&ObjectPatch>,
    ) -> ObjectResource {
        let mut resource =
            ObjectResource::new(&self.config.base_url, bucket, key, content_type, size);
        resource
            .storage_class
            .clone_from(&self.config.default_storage_class);
        if let Some(metadata) = metadata {
            resource.merge_writable(metadata);
        }
        resource
    }

    /// Remove every object, session and byte of content. With
    /// `keep_buckets`, bucket records survive empty.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StorageError::Internal`] on I/O failure.
    pub fn wipe(&self, keep_buckets: bool) -> StorageResult<()> {
        self.catalog.wipe(keep_buckets)
    }
}

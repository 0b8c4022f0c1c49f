//! Content stores: where object bytes and transient upload data live.
//!
//! The catalog only records metadata; bytes go through a [`ContentStore`]
//! keyed by `(container, key)`. A container is either a bucket name or one
//! of the reserved transient containers [`RESUMABLE_CONTAINER`] and
//! [`MULTIPART_CONTAINER`]. The store also holds the serialized catalog
//! snapshot so that both backends persist metadata with the same contract.
//!
//! Two backends are provided:
//!
//! - [`DiskStore`] lays containers out as directories under a root path.
//! - [`MemoryStore`] keeps everything in a concurrent map.

use std::fmt;

use bytes::Bytes;

use crate::error::{StorageError, StorageResult};

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

/// Container holding resumable upload buffers.
pub const RESUMABLE_CONTAINER: &str = "_resumable";

/// Container holding multipart upload parts.
pub const MULTIPART_CONTAINER: &str = "_multipart";

/// Check that `container` is a single safe path segment.
///
/// # Errors
///
/// Returns [`StorageError::InvalidArgument`] otherwise.
pub fn validate_container(container: &str) -> StorageResult<()> {
    if container.contains('/') || !is_safe_segment(container) {
        return Err(StorageError::invalid_argument(format!(
            "invalid container name: {container:?}"
        )));
    }
    Ok(())
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".."
}

/// Byte storage backing the catalog.
///
/// Implementations must be safe for concurrent writes to distinct keys.
pub trait ContentStore: Send + Sync + fmt::Debug {
    /// Write `data` at `container/key`, replacing any previous content.
    ///
    /// Keys are opaque: `a`, `a/b`, `dir/`, `a//b` and `../x` are all
    /// distinct, storable keys.
    fn write(&self, container: &str, key: &str, data: &[u8]) -> StorageResult<()>;

    /// Read the content at `container/key`.
    ///
    /// Returns `Ok(None)` when nothing is stored there.
    fn read(&self, container: &str, key: &str) -> StorageResult<Option<Bytes>>;

    /// Remove the content at `container/key`. Absence is not an error.
    fn delete(&self, container: &str, key: &str) -> StorageResult<()>;

    /// Remove every key under `container`.
    fn delete_container(&self, container: &str) -> StorageResult<()>;

    /// Remove every top-level key of `container` starting with `prefix`.
    /// Returns how many were removed.
    ///
    /// Only keys without a `/` are considered.
    fn delete_prefixed(&self, container: &str, prefix: &str) -> StorageResult<usize>;

    /// Remove all containers and the snapshot.
    fn wipe(&self) -> StorageResult<()>;

    /// Load the persisted catalog snapshot, if one exists.
    fn load_snapshot(&self) -> StorageResult<Option<Bytes>>;

    /// Replace the persisted catalog snapshot.
    fn save_snapshot(&self, data: &[u8]) -> StorageResult<()>;
}

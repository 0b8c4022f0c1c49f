//! In-memory content store.

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use super::{ContentStore, validate_container};
use crate::error::StorageResult;

/// Content key: `(container, key)`.
type ContentKey = (String, String);

/// Content store that never touches the filesystem.
///
/// Thread-safe: content lives in a [`DashMap`] so concurrent writes to
/// distinct keys do not contend on a single lock.
///
/// # Examples
///
/// ```
/// use gcstack_storage_core::storage::{ContentStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.write("bucket", "a/b.txt", b"hello").unwrap();
/// let data = store.read("bucket", "a/b.txt").unwrap().unwrap();
/// assert_eq!(data.as_ref(), b"hello");
/// ```
#[derive(Default)]
pub struct MemoryStore {
    /// Content keyed by `(container, key)`.
    content: DashMap<ContentKey, Bytes>,
    /// Serialized catalog snapshot.
    snapshot: RwLock<Option<Bytes>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("content_count", &self.content.len())
            .field("has_snapshot", &self.snapshot.read().is_some())
            .finish()
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        debug!("creating MemoryStore");
        Self::default()
    }
}

impl ContentStore for MemoryStore {
    fn write(&self, container: &str, key: &str, data: &[u8]) -> StorageResult<()> {
        validate_container(container)?;
        trace!(container, key, size = data.len(), "stored content");
        self.content.insert(
            (container.to_owned(), key.to_owned()),
            Bytes::copy_from_slice(data),
        );
        Ok(())
    }

    fn read(&self, container: &str, key: &str) -> StorageResult<Option<Bytes>> {
        validate_container(container)?;
        Ok(self
            .content
            .get(&(container.to_owned(), key.to_owned()))
            .map(|entry| entry.value().clone()))
    }

    fn delete(&self, container: &str, key: &str) -> StorageResult<()> {
        validate_container(container)?;
        if self
            .content
            .remove(&(container.to_owned(), key.to_owned()))
            .is_none()
        {
            debug!(container, key, "content already absent");
        } else {
            trace!(container, key, "deleted content");
        }
        Ok(())
    }

    fn delete_container(&self, container: &str) -> StorageResult<()> {
        validate_container(container)?;
        let before = self.content.len();
        self.content.retain(|(c, _), _| c != container);
        debug!(
            container,
            removed = before - self.content.len(),
            "deleted container"
        );
        Ok(())
    }

    fn delete_prefixed(&self, container: &str, prefix: &str) -> StorageResult<usize> {
        validate_container(container)?;
        let before = self.content.len();
        self.content
            .retain(|(c, k), _| !(c == container && k.starts_with(prefix) && !k.contains('/')));
        let removed = before - self.content.len();
        trace!(container, prefix, removed, "deleted prefixed content");
        Ok(removed)
    }

    fn wipe(&self) -> StorageResult<()> {
        debug!("wiping memory store");
        self.content.clear();
        *self.snapshot.write() = None;
        Ok(())
    }

    fn load_snapshot(&self) -> StorageResult<Option<Bytes>> {
        Ok(self.snapshot.read().clone())
    }

    fn save_snapshot(&self, data: &[u8]) -> StorageResult<()> {
        *self.snapshot.write() = Some(Bytes::copy_from_slice(data));
        Ok(())
    }
}

//! The persisted catalog of buckets, objects and upload sessions.
//!
//! [`Catalog`] is the single owner of metadata for one storage root. Every
//! mutation runs against a clone of the current [`CatalogState`], rewrites
//! the snapshot from that clone and only then swaps it in, so a failed
//! persist leaves the in-memory view exactly as it was. Content overwritten
//! along the way goes through a [`ContentJournal`] and is put back when the
//! mutation fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use bytes::{Bytes, BytesMut};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::bucket::BucketResource;
use super::object::{ObjectPatch, ObjectResource};
use super::session::{MAX_PART_NUMBER, MultipartUpload, ResumableUpload, part_key};
use crate::error::{StorageError, StorageResult};
use crate::listing::{ListResult, list_objects};
use crate::storage::{ContentStore, MULTIPART_CONTAINER, RESUMABLE_CONTAINER};
use crate::utils::{generate_session_id, safe_id, timestamp_now};

// ---------------------------------------------------------------------------
// CatalogState
// ---------------------------------------------------------------------------

/// Everything the catalog knows, in snapshot form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogState {
    /// Bucket name to bucket resource.
    #[serde(default)]
    pub buckets: BTreeMap<String, BucketResource>,
    /// Bucket name to (object key to object resource).
    #[serde(default)]
    pub objects: BTreeMap<String, BTreeMap<String, ObjectResource>>,
    /// Resumable session id to session.
    #[serde(default)]
    pub resumable: BTreeMap<String, ResumableUpload>,
    /// Multipart upload id to session.
    #[serde(default)]
    pub multipart: BTreeMap<String, MultipartUpload>,
}

impl CatalogState {
    fn require_bucket(&self, bucket: &str) -> StorageResult<()> {
        if self.buckets.contains_key(bucket) {
            Ok(())
        } else {
            Err(no_such_bucket(bucket))
        }
    }

    fn object(&self, bucket: &str, key: &str) -> StorageResult<&ObjectResource> {
        self.require_bucket(bucket)?;
        self.objects
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .ok_or_else(|| no_such_object(bucket, key))
    }
}

fn no_such_bucket(bucket: &str) -> StorageError {
    StorageError::NoSuchBucket {
        bucket: bucket.to_owned(),
    }
}

fn no_such_object(bucket: &str, key: &str) -> StorageError {
    StorageError::NoSuchObject {
        bucket: bucket.to_owned(),
        key: key.to_owned(),
    }
}

fn no_such_upload(upload_id: &str) -> StorageError {
    StorageError::NoSuchUpload {
        upload_id: upload_id.to_owned(),
    }
}

fn no_such_multipart(upload_id: &str) -> StorageError {
    StorageError::NoSuchMultipartUpload {
        upload_id: upload_id.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// ContentJournal
// ---------------------------------------------------------------------------

/// Content written during one catalog mutation, with what it replaced.
struct ContentJournal<'a> {
    store: &'a dyn ContentStore,
    replaced: Vec<(String, String, Option<Bytes>)>,
}

impl<'a> ContentJournal<'a> {
    fn new(store: &'a dyn ContentStore) -> Self {
        Self {
            store,
            replaced: Vec::new(),
        }
    }

    /// Write `data` at `container/key`, remembering the previous content.
    fn write(&mut self, container: &str, key: &str, data: &[u8]) -> StorageResult<()> {
        let previous = self.store.read(container, key)?;
        self.replaced
            .push((container.to_owned(), key.to_owned(), previous));
        self.store.write(container, key, data)
    }

    /// Put every journaled location back the way it was, newest first.
    fn revert(self) {
        for (container, key, previous) in self.replaced.into_iter().rev() {
            let result = match &previous {
                Some(data) => self.store.write(&container, &key, data),
                None => self.store.delete(&container, &key),
            };
            match result {
                Ok(()) => debug!(container = %container, key = %key, "reverted content"),
                Err(e) => {
                    warn!(container = %container, key = %key, error = %e, "failed to revert content");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Authoritative metadata for one storage root, bound to its content store.
pub struct Catalog {
    state: RwLock<CatalogState>,
    store: Arc<dyn ContentStore>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Catalog")
            .field("bucket_count", &state.buckets.len())
            .field("resumable_count", &state.resumable.len())
            .field("multipart_count", &state.multipart.len())
            .field("store", &self.store)
            .finish()
    }
}

impl Catalog {
    /// Load the catalog from the store's snapshot. A missing snapshot means
    /// an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the snapshot cannot be read or
    /// parsed.
    pub fn open(store: Arc<dyn ContentStore>) -> StorageResult<Self> {
        let state = match store.load_snapshot()? {
            Some(data) => {
                serde_json::from_slice(&data).context("failed to parse catalog snapshot")?
            }
            None => CatalogState::default(),
        };
        debug!(
            buckets = state.buckets.len(),
            resumable = state.resumable.len(),
            multipart = state.multipart.len(),
            "opened catalog"
        );
        Ok(Self {
            state: RwLock::new(state),
            store,
        })
    }

    /// The content store backing this catalog.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// A consistent copy of the whole catalog.
    #[must_use]
    pub fn snapshot(&self) -> CatalogState {
        self.state.read().clone()
    }

    /// Apply `op` to a copy of the state, persist it, then publish it.
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut CatalogState) -> StorageResult<T>,
    ) -> StorageResult<T> {
        self.mutate_content(|state, _| op(state))
    }

    /// Like [`Catalog::mutate`], for operations that overwrite content.
    ///
    /// Writes made through the journal are reverted, still under the write
    /// lock, if `op` or the snapshot write fails.
    fn mutate_content<T>(
        &self,
        op: impl FnOnce(&mut CatalogState, &mut ContentJournal<'_>) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut guard = self.state.write();
        let mut next = guard.clone();
        let mut journal = ContentJournal::new(self.store.as_ref());
        let result = op(&mut next, &mut journal).and_then(|value| {
            self.persist(&next)?;
            Ok(value)
        });
        match result {
            Ok(value) => {
                *guard = next;
                Ok(value)
            }
            Err(e) => {
                journal.revert();
                Err(e)
            }
        }
    }

    fn persist(&self, state: &CatalogState) -> StorageResult<()> {
        let data = serde_json::to_vec_pretty(state).context("failed to serialize catalog")?;
        self.store.save_snapshot(&data)?;
        debug!(size = data.len(), "persisted catalog snapshot");
        Ok(())
    }

    /// Delete transient content, logging instead of failing.
    fn discard(&self, container: &str, key: &str) {
        if let Err(e) = self.store.delete(container, key) {
            warn!(container, key, error = %e, "failed to delete content");
        }
    }

    fn discard_parts(&self, upload_id: &str) {
        let prefix = format!("{}.", safe_id(upload_id));
        match self.store.delete_prefixed(MULTIPART_CONTAINER, &prefix) {
            Ok(removed) => debug!(upload_id, removed, "removed multipart parts"),
            Err(e) => warn!(upload_id, error = %e, "failed to remove multipart parts"),
        }
    }

    // -----------------------------------------------------------------------
    // Buckets
    // -----------------------------------------------------------------------

    /// Store a bucket. Reusing a name replaces the previous record.
    pub fn create_bucket(&self, resource: BucketResource) -> StorageResult<BucketResource> {
        self.mutate(|state| {
            state
                .buckets
                .insert(resource.name.clone(), resource.clone());
            Ok(())
        })?;
        info!(bucket = %resource.name, "bucket created");
        Ok(resource)
    }

    /// Look up a bucket.
    pub fn get_bucket(&self, name: &str) -> StorageResult<BucketResource> {
        self.state
            .read()
            .buckets
            .get(name)
            .cloned()
            .ok_or_else(|| no_such_bucket(name))
    }

    /// All buckets, ordered by name.
    #[must_use]
    pub fn list_buckets(&self) -> Vec<BucketResource> {
        self.state.read().buckets.values().cloned().collect()
    }

    /// Delete an empty bucket and its content subtree.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NoSuchBucket`] if the bucket does not exist.
    /// - [`StorageError::BucketNotEmpty`] if it still holds objects.
    /// - [`StorageError::BucketHasPendingUploads`] if a resumable session
    ///   still targets it.
    pub fn delete_bucket(&self, name: &str) -> StorageResult<()> {
        self.mutate(|state| {
            state.require_bucket(name)?;
            if state.objects.get(name).is_some_and(|o| !o.is_empty()) {
                return Err(StorageError::BucketNotEmpty {
                    bucket: name.to_owned(),
                });
            }
            if state.resumable.values().any(|s| s.bucket() == name) {
                return Err(StorageError::BucketHasPendingUploads {
                    bucket: name.to_owned(),
                });
            }
            state.buckets.remove(name);
            state.objects.remove(name);
            self.store.delete_container(name)
        })?;
        info!(bucket = %name, "bucket deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// List a bucket with optional prefix and delimiter.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoSuchBucket`] if the bucket does not exist.
    pub fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        delimiter: Option<&str>,
    ) -> StorageResult<ListResult> {
        let state = self.state.read();
        state.require_bucket(bucket)?;
        Ok(state
            .objects
            .get(bucket)
            .map(|objects| list_objects(objects, prefix, delimiter))
            .unwrap_or_default())
    }

    /// Write `content` and install `resource` as the current object at
    /// `bucket/key`, replacing any previous one.
    ///
    /// When `session_id` names a resumable session, that session and its
    /// buffered bytes are retired in the same step.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NoSuchBucket`] if the bucket does not exist.
    /// - [`StorageError::NoSuchUpload`] if `session_id` is unknown.
    pub fn create_object(
        &self,
        bucket: &str,
        key: &str,
        content: &[u8],
        resource: ObjectResource,
        session_id: Option<&str>,
    ) -> StorageResult<ObjectResource> {
        let retired = self.mutate_content(|state, journal| {
            state.require_bucket(bucket)?;
            let session = session_id
                .map(|id| state.resumable.remove(id).ok_or_else(|| no_such_upload(id)))
                .transpose()?;
            journal.write(bucket, key, content)?;
            state
                .objects
                .entry(bucket.to_owned())
                .or_default()
                .insert(key.to_owned(), resource.clone());
            Ok(session)
        })?;

        if let Some(session) = retired {
            self.discard(RESUMABLE_CONTAINER, &session.buffer_key());
            debug!(upload_id = %session.upload_id, "retired resumable session");
        }
        info!(bucket, key, size = content.len(), "object created");
        Ok(resource)
    }

    /// Look up an object resource.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the bucket or the key is missing.
    pub fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectResource> {
        self.state.read().object(bucket, key).cloned()
    }

    /// Read an object's bytes.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the bucket, the key or the stored
    /// content is missing.
    pub fn get_object_bytes(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        self.get_object_with_content(bucket, key)
            .map(|(_, content)| content)
    }

    /// Read an object's resource and bytes as one consistent pair.
    ///
    /// # Errors
    ///
    /// Same as [`Catalog::get_object_bytes`].
    pub fn get_object_with_content(
        &self,
        bucket: &str,
        key: &str,
    ) -> StorageResult<(ObjectResource, Bytes)> {
        let state = self.state.read();
        let resource = state.object(bucket, key)?.clone();
        let content = self
            .store
            .read(bucket, key)?
            .ok_or_else(|| no_such_object(bucket, key))?;
        Ok((resource, content))
    }

    /// Merge `patch` into an existing object.
    ///
    /// Returns `None` without touching anything if the bucket or key is
    /// absent; callers wanting a not-found error check first with
    /// [`Catalog::get_object`].
    pub fn patch_object(
        &self,
        bucket: &str,
        key: &str,
        patch: &ObjectPatch,
    ) -> StorageResult<Option<ObjectResource>> {
        let exists = self.state.read().object(bucket, key).is_ok();
        if !exists {
            return Ok(None);
        }
        let patched = self.mutate(|state| {
            Ok(state
                .objects
                .get_mut(bucket)
                .and_then(|objects| objects.get_mut(key))
                .map(|obj| {
                    obj.apply_patch(patch);
                    obj.clone()
                }))
        })?;
        if let Some(obj) = &patched {
            debug!(bucket, key, metageneration = %obj.metageneration, "object patched");
        }
        Ok(patched)
    }

    /// Remove an object and, best-effort, its bytes.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the bucket or key is missing.
    pub fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.mutate(|state| {
            state.object(bucket, key)?;
            if let Some(objects) = state.objects.get_mut(bucket) {
                objects.remove(key);
            }
            Ok(())
        })?;
        self.discard(bucket, key);
        info!(bucket, key, "object deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Resumable sessions
    // -----------------------------------------------------------------------

    /// Open a resumable session that will create `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoSuchBucket`] if the target bucket does not
    /// exist.
    pub fn create_resumable(
        &self,
        resource: ObjectResource,
        declared_size: Option<u64>,
    ) -> StorageResult<String> {
        let upload_id = self.mutate(|state| {
            state.require_bucket(&resource.bucket)?;
            let upload_id = generate_session_id(&resource.bucket, &resource.name);
            let session = ResumableUpload {
                upload_id: upload_id.clone(),
                resource: resource.clone(),
                declared_size,
                received: 0,
                initiated: timestamp_now(),
            };
            state.resumable.insert(upload_id.clone(), session);
            Ok(upload_id)
        })?;
        debug!(
            bucket = %resource.bucket,
            key = %resource.name,
            upload_id = %upload_id,
            "resumable session created"
        );
        Ok(upload_id)
    }

    /// Look up a resumable session.
    pub fn get_resumable(&self, upload_id: &str) -> StorageResult<ResumableUpload> {
        self.state
            .read()
            .resumable
            .get(upload_id)
            .cloned()
            .ok_or_else(|| no_such_upload(upload_id))
    }

    /// Append `chunk` to a session's buffer and return the session together
    /// with everything buffered so far.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoSuchUpload`] if the session is unknown.
    pub fn append_resumable(
        &self,
        upload_id: &str,
        chunk: &[u8],
    ) -> StorageResult<(ResumableUpload, Bytes)> {
        self.mutate_content(|state, journal| {
            let session = state
                .resumable
                .get_mut(upload_id)
                .ok_or_else(|| no_such_upload(upload_id))?;
            let key = session.buffer_key();

            let previous = self
                .store
                .read(RESUMABLE_CONTAINER, &key)?
                .unwrap_or_default();
            let mut buffer = BytesMut::with_capacity(previous.len() + chunk.len());
            buffer.extend_from_slice(&previous);
            buffer.extend_from_slice(chunk);
            journal.write(RESUMABLE_CONTAINER, &key, &buffer)?;

            session.received = buffer.len() as u64;
            debug!(
                upload_id,
                chunk = chunk.len(),
                received = session.received,
                "appended resumable chunk"
            );
            Ok((session.clone(), buffer.freeze()))
        })
    }

    /// Drop a resumable session and its buffered bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoSuchUpload`] if the session is unknown.
    pub fn delete_resumable(&self, upload_id: &str) -> StorageResult<()> {
        let session = self.mutate(|state| {
            state
                .resumable
                .remove(upload_id)
                .ok_or_else(|| no_such_upload(upload_id))
        })?;
        self.discard(RESUMABLE_CONTAINER, &session.buffer_key());
        info!(upload_id, "resumable session cancelled");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Multipart sessions
    // -----------------------------------------------------------------------

    /// Open a multipart upload that will create `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoSuchBucket`] if the target bucket does not
    /// exist.
    pub fn create_multipart(&self, resource: ObjectResource) -> StorageResult<String> {
        let upload_id = self.mutate(|state| {
            state.require_bucket(&resource.bucket)?;
            let upload_id = generate_session_id(&resource.bucket, &resource.name);
            let session = MultipartUpload {
                upload_id: upload_id.clone(),
                resource: resource.clone(),
                initiated: timestamp_now(),
            };
            state.multipart.insert(upload_id.clone(), session);
            Ok(upload_id)
        })?;
        debug!(
            bucket = %resource.bucket,
            key = %resource.name,
            upload_id = %upload_id,
            "multipart upload created"
        );
        Ok(upload_id)
    }

    /// Look up a multipart upload.
    pub fn get_multipart(&self, upload_id: &str) -> StorageResult<MultipartUpload> {
        self.state
            .read()
            .multipart
            .get(upload_id)
            .cloned()
            .ok_or_else(|| no_such_multipart(upload_id))
    }

    /// Store one part. Re-sending a part number replaces it.
    ///
    /// Parts of the same upload may be written concurrently; only the
    /// session lookups touch the catalog lock. A part that lands after the
    /// upload was aborted or completed is removed again.
    ///
    /// # Errors
    ///
    /// - [`StorageError::InvalidArgument`] if `part_number` is outside
    ///   `1..=10000`.
    /// - [`StorageError::NoSuchMultipartUpload`] if the upload is unknown.
    pub fn put_part(&self, upload_id: &str, part_number: u32, data: &[u8]) -> StorageResult<()> {
        if !(1..=MAX_PART_NUMBER).contains(&part_number) {
            return Err(StorageError::invalid_argument(format!(
                "part number must be between 1 and {MAX_PART_NUMBER}, got {part_number}"
            )));
        }
        if !self.state.read().multipart.contains_key(upload_id) {
            return Err(no_such_multipart(upload_id));
        }
        let key = part_key(upload_id, part_number);
        self.store.write(MULTIPART_CONTAINER, &key, data)?;
        if !self.state.read().multipart.contains_key(upload_id) {
            self.discard(MULTIPART_CONTAINER, &key);
            debug!(upload_id, part_number, "dropped part of retired upload");
            return Err(no_such_multipart(upload_id));
        }
        debug!(upload_id, part_number, size = data.len(), "stored part");
        Ok(())
    }

    /// Concatenate the stored parts of an upload in ascending order.
    ///
    /// Assembly starts at part 1 and stops at the first missing number;
    /// parts after a gap are not included.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoSuchMultipartUpload`] if the upload is
    /// unknown.
    pub fn assemble_parts(&self, upload_id: &str) -> StorageResult<(MultipartUpload, Bytes)> {
        let session = self.get_multipart(upload_id)?;
        let mut content = BytesMut::new();
        let mut parts = 0u32;
        for part_number in 1..=MAX_PART_NUMBER {
            let Some(part) = self
                .store
                .read(MULTIPART_CONTAINER, &session.part_key(part_number))?
            else {
                break;
            };
            content.extend_from_slice(&part);
            parts += 1;
        }
        debug!(upload_id, parts, size = content.len(), "assembled parts");
        Ok((session, content.freeze()))
    }

    /// Materialize a multipart upload as `resource` with `content`, then
    /// remove the session and all its parts.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NoSuchMultipartUpload`] if the upload is unknown.
    /// - [`StorageError::NoSuchBucket`] if the target bucket is gone.
    pub fn commit_multipart(
        &self,
        upload_id: &str,
        content: &[u8],
        resource: ObjectResource,
    ) -> StorageResult<ObjectResource> {
        let bucket = resource.bucket.clone();
        let key = resource.name.clone();
        self.mutate_content(|state, journal| {
            state
                .multipart
                .remove(upload_id)
                .ok_or_else(|| no_such_multipart(upload_id))?;
            state.require_bucket(&bucket)?;
            journal.write(&bucket, &key, content)?;
            state
                .objects
                .entry(bucket.clone())
                .or_default()
                .insert(key.clone(), resource.clone());
            Ok(())
        })?;
        self.discard_parts(upload_id);
        info!(bucket = %bucket, key = %key, upload_id, size = content.len(), "multipart upload completed");
        Ok(resource)
    }

    /// Drop a multipart upload and its parts.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoSuchMultipartUpload`] if the upload is
    /// unknown.
    pub fn abort_multipart(&self, upload_id: &str) -> StorageResult<()> {
        self.mutate(|state| {
            state
                .multipart
                .remove(upload_id)
                .map(|_| ())
                .ok_or_else(|| no_such_multipart(upload_id))
        })?;
        self.discard_parts(upload_id);
        info!(upload_id, "multipart upload aborted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------------

    /// Remove all content and sessions. With `keep_buckets`, bucket records
    /// survive (emptied); otherwise the catalog ends up completely empty.
    pub fn wipe(&self, keep_buckets: bool) -> StorageResult<()> {
        self.mutate(|state| {
            self.store.wipe()?;
            let buckets = if keep_buckets {
                std::mem::take(&mut state.buckets)
            } else {
                BTreeMap::new()
            };
            *state = CatalogState {
                buckets,
                ..CatalogState::default()
            };
            Ok(())
        })?;
        info!(keep_buckets, "storage wiped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

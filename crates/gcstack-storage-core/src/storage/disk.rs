//! On-disk content store.
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/.meta                          catalog snapshot
//! <root>/<bucket>/<seg>.d/<leaf>.f      object content
//! <root>/_resumable/<safe id>.f         resumable buffers
//! <root>/_multipart/<safe id>.NNNNN.f   multipart parts
//! ```
//!
//! Keys are split on `/`. Every segment but the last becomes a directory
//! named `<segment>.d` and the last one a file named `<segment>.f`, with
//! `%`, `\`, `:` and control characters percent-encoded. The suffixes keep
//! `a` and `a/b` apart, and no segment can resolve to `.`, `..` or an empty
//! name, so every key stays inside its container.

use std::borrow::Cow;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use bytes::Bytes;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use tracing::{debug, trace};

use super::{ContentStore, validate_container};
use crate::error::StorageResult;

/// File name of the catalog snapshot inside the storage root.
pub const SNAPSHOT_FILE: &str = ".meta";

/// Characters escaped inside an encoded key segment.
const SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS.add(b'%').add(b'\\').add(b':');

/// Suffix of a directory standing for an intermediate key segment.
const DIR_SUFFIX: &str = ".d";

/// Suffix of a file holding content.
const FILE_SUFFIX: &str = ".f";

/// Map an opaque key to its relative path inside a container.
fn encode_key(key: &str) -> PathBuf {
    let mut segments = key.split('/').peekable();
    let mut path = PathBuf::new();
    while let Some(segment) = segments.next() {
        let suffix = if segments.peek().is_some() {
            DIR_SUFFIX
        } else {
            FILE_SUFFIX
        };
        path.push(format!(
            "{}{suffix}",
            utf8_percent_encode(segment, SEGMENT_ENCODE_SET)
        ));
    }
    path
}

/// Recover the key of a top-level content file from its file name.
fn decode_file_name(name: &str) -> Option<String> {
    let encoded = name.strip_suffix(FILE_SUFFIX)?;
    percent_decode_str(encoded)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

/// Content store rooted at a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open (creating if necessary) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StorageError::Internal`] if the root cannot be
    /// created.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create storage root {}", root.display()))?;
        debug!(root = %root.display(), "opened DiskStore");
        Ok(Self { root })
    }

    /// The storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, container: &str, key: &str) -> StorageResult<PathBuf> {
        validate_container(container)?;
        Ok(self.root.join(container).join(encode_key(key)))
    }
}

impl ContentStore for DiskStore {
    fn write(&self, container: &str, key: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.path_of(container, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))?;
        trace!(path = %path.display(), size = data.len(), "stored content");
        Ok(())
    }

    fn read(&self, container: &str, key: &str) -> StorageResult<Option<Bytes>> {
        let path = self.path_of(container, key)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("failed to read {}", path.display()))
                .into()),
        }
    }

    fn delete(&self, container: &str, key: &str) -> StorageResult<()> {
        let path = self.path_of(container, key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                trace!(path = %path.display(), "deleted content");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "content already absent");
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("failed to delete {}", path.display()))
                .into()),
        }
    }

    fn delete_container(&self, container: &str) -> StorageResult<()> {
        validate_container(container)?;
        let path = self.root.join(container);
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "deleted container");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("failed to delete {}", path.display()))
                .into()),
        }
    }

    fn delete_prefixed(&self, container: &str, prefix: &str) -> StorageResult<usize> {
        validate_container(container)?;
        let dir = self.root.join(container);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("failed to list {}", dir.display()))
                    .into());
            }
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.context("failed to read directory entry")?;
            let matches = entry
                .file_name()
                .to_str()
                .and_then(decode_file_name)
                .is_some_and(|key| key.starts_with(prefix));
            if matches && entry.path().is_file() {
                fs::remove_file(entry.path())
                    .with_context(|| format!("failed to delete {}", entry.path().display()))?;
                removed += 1;
            }
        }
        trace!(container, prefix, removed, "deleted prefixed content");
        Ok(removed)
    }

    fn wipe(&self) -> StorageResult<()> {
        debug!(root = %self.root.display(), "wiping disk store");
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to list {}", self.root.display()))?;
        for entry in entries {
            let path = entry.context("failed to read directory entry")?.path();
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            result.with_context(|| format!("failed to remove {}", path.display()))?;
        }
        Ok(())
    }

    fn load_snapshot(&self) -> StorageResult<Option<Bytes>> {
        let path = self.root.join(SNAPSHOT_FILE);
        match fs::read(&path) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("failed to read {}", path.display()))
                .into()),
        }
    }

    fn save_snapshot(&self, data: &[u8]) -> StorageResult<()> {
        let path = self.root.join(SNAPSHOT_FILE);
        let mut temp = tempfile::NamedTempFile::new_in(&self.root)
            .context("failed to create snapshot temp file")?;
        temp.write_all(data)
            .context("failed to write snapshot temp file")?;
        temp.as_file()
            .sync_all()
            .context("failed to sync snapshot temp file")?;
        temp.persist(&path)
            .with_context(|| format!("failed to persist {}", path.display()))?;
        trace!(path = %path.display(), size = data.len(), "saved catalog snapshot");
        Ok(())
    }
}

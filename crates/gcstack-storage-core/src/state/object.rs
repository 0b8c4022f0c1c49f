//! Object resource types and metadata patching.
//!
//! [`ObjectResource`] is the JSON document the catalog stores for every
//! object; [`ObjectPatch`] is the writable-field subset accepted by metadata
//! updates and by upload initiation.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{timestamp_now, unix_seconds};

/// Resource kind reported for objects.
pub const OBJECT_KIND: &str = "storage#object";

/// Storage class assigned when the caller does not choose one.
pub const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

// ---------------------------------------------------------------------------
// ObjectResource
// ---------------------------------------------------------------------------

/// Catalog record for a single object.
///
/// Serializes to the same camelCase JSON layout as the real service, with
/// `size`, `generation` and `metageneration` rendered as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectResource {
    /// Always [`OBJECT_KIND`].
    pub kind: String,
    /// `bucket/name/generation`.
    pub id: String,
    /// API path of this resource.
    pub self_link: String,
    /// Download URL for the content.
    pub media_link: String,
    /// Object key.
    pub name: String,
    /// Owning bucket name.
    pub bucket: String,
    /// Version identifier, Unix seconds at creation.
    pub generation: String,
    /// Metadata version, incremented by every patch.
    pub metageneration: String,
    /// MIME type of the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Creation timestamp (RFC 3339).
    pub time_created: String,
    /// Last update timestamp (RFC 3339).
    pub updated: String,
    /// Storage class; stored, never acted upon.
    pub storage_class: String,
    /// When the storage class last changed (RFC 3339).
    pub time_storage_class_updated: String,
    /// Content length in bytes.
    #[serde(with = "string_u64")]
    pub size: u64,
    /// Base64 MD5 digest of the content.
    #[serde(default)]
    pub md5_hash: Option<String>,
    /// Base64 big-endian CRC32C of the content.
    #[serde(default)]
    pub crc32c: Option<String>,
    /// Entity tag.
    #[serde(default)]
    pub etag: Option<String>,
    /// User-controlled timestamp; only moves forward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_time: Option<String>,
    /// User metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    /// `Cache-Control` served with the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    /// `Content-Disposition` served with the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    /// `Content-Encoding` served with the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    /// `Content-Language` served with the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
}

impl ObjectResource {
    /// Build the skeleton resource for a new object.
    ///
    /// Checksums and the ETag are left unset; they are filled in by
    /// [`crate::checksums::compute_and_reconcile`] once the content is known.
    ///
    /// # Examples
    ///
    /// ```
    /// use gcstack_storage_core::state::ObjectResource;
    ///
    /// let obj = ObjectResource::new("http://localhost:9023", "b", "a/b.txt", Some("text/plain"), 3);
    /// assert_eq!(obj.metageneration, "1");
    /// assert_eq!(obj.self_link, "/storage/v1/b/b/o/a/b.txt");
    /// assert!(obj.crc32c.is_none());
    /// ```
    #[must_use]
    pub fn new(
        base_url: &str,
        bucket: &str,
        name: &str,
        content_type: Option<&str>,
        size: u64,
    ) -> Self {
        let generation = unix_seconds();
        let now = timestamp_now();
        Self {
            kind: OBJECT_KIND.to_owned(),
            id: format!("{bucket}/{name}/{generation}"),
            self_link: format!("/storage/v1/b/{bucket}/o/{name}"),
            media_link: format!(
                "{base_url}/download/storage/v1/b/{bucket}/o/{name}?generation={generation}&alt=media"
            ),
            name: name.to_owned(),
            bucket: bucket.to_owned(),
            generation: generation.to_string(),
            metageneration: "1".to_owned(),
            content_type: content_type.map(str::to_owned),
            time_created: now.clone(),
            updated: now.clone(),
            storage_class: DEFAULT_STORAGE_CLASS.to_owned(),
            time_storage_class_updated: now,
            size,
            md5_hash: None,
            crc32c: None,
            etag: None,
            custom_time: None,
            metadata: None,
            cache_control: None,
            content_disposition: None,
            content_encoding: None,
            content_language: None,
        }
    }

    /// Apply a metadata patch and bump `metageneration`.
    ///
    /// An empty patch leaves the resource untouched. Returns whether
    /// anything was applied.
    pub fn apply_patch(&mut self, patch: &ObjectPatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        let next = self
            .metageneration
            .parse::<u64>()
            .map_or(1, |current| current + 1);
        self.metageneration = next.to_string();
        self.merge_writable(patch);
        true
    }

    /// Copy every field present in `patch` onto this resource.
    ///
    /// `customTime` is ignored when it would move backwards. Does not touch
    /// `metageneration`.
    pub fn merge_writable(&mut self, patch: &ObjectPatch) {
        merge(&mut self.cache_control, &patch.cache_control);
        merge(&mut self.content_disposition, &patch.content_disposition);
        merge(&mut self.content_encoding, &patch.content_encoding);
        merge(&mut self.content_language, &patch.content_language);
        merge(&mut self.content_type, &patch.content_type);
        merge(&mut self.crc32c, &patch.crc32c);
        merge(&mut self.md5_hash, &patch.md5_hash);
        merge(&mut self.metadata, &patch.metadata);

        if let Some(custom_time) = &patch.custom_time {
            let older = self
                .custom_time
                .as_deref()
                .is_some_and(|stored| compare_times(stored, custom_time) == Ordering::Greater);
            if !older {
                self.custom_time = Some(custom_time.clone());
            }
        }

        if let Some(storage_class) = &patch.storage_class {
            if *storage_class != self.storage_class {
                self.time_storage_class_updated = timestamp_now();
            }
            self.storage_class.clone_from(storage_class);
        }
    }

    /// The writable fields of this resource, as a patch.
    #[must_use]
    pub fn writable_fields(&self) -> ObjectPatch {
        ObjectPatch {
            cache_control: self.cache_control.clone(),
            content_disposition: self.content_disposition.clone(),
            content_encoding: self.content_encoding.clone(),
            content_language: self.content_language.clone(),
            content_type: self.content_type.clone(),
            crc32c: self.crc32c.clone(),
            custom_time: self.custom_time.clone(),
            md5_hash: self.md5_hash.clone(),
            metadata: self.metadata.clone(),
            storage_class: Some(self.storage_class.clone()),
        }
    }
}

fn merge<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if let Some(v) = value {
        *target = Some(v.clone());
    }
}

/// Order two timestamps, by instant when both parse as RFC 3339 and
/// lexically otherwise.
fn compare_times(a: &str, b: &str) -> Ordering {
    match (
        DateTime::parse_from_rfc3339(a),
        DateTime::parse_from_rfc3339(b),
    ) {
        (Ok(a), Ok(b)) => a.with_timezone(&Utc).cmp(&b.with_timezone(&Utc)),
        _ => a.cmp(b),
    }
}

// ---------------------------------------------------------------------------
// ObjectPatch
// ---------------------------------------------------------------------------

/// The writable subset of an object resource.
///
/// Unknown fields are dropped on deserialization, so a full resource
/// document can be passed through and only the allow-listed fields stick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPatch {
    /// `Cache-Control` served with the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    /// `Content-Disposition` served with the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    /// `Content-Encoding` served with the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    /// `Content-Language` served with the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    /// MIME type of the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Expected base64 CRC32C.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crc32c: Option<String>,
    /// User-controlled timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_time: Option<String>,
    /// Expected base64 MD5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5_hash: Option<String>,
    /// User metadata; replaces the stored map wholesale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    /// Storage class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

impl ObjectPatch {
    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// serde helper
// ---------------------------------------------------------------------------

/// Serialize a `u64` as a decimal string, accepting either form on input.
pub(crate) mod string_u64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => s.parse().map_err(serde::de::Error::custom),
            StringOrNumber::Number(n) => Ok(n),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

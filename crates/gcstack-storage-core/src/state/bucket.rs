//! Bucket resource.

use serde::{Deserialize, Serialize};

use crate::utils::timestamp_now;

/// Resource kind reported for buckets.
pub const BUCKET_KIND: &str = "storage#bucket";

/// Location assigned when the caller does not choose one.
pub const DEFAULT_LOCATION: &str = "US";

/// Catalog record for a bucket.
///
/// The engine never interprets the resource beyond its name; any field it
/// does not model is carried through untouched in [`BucketResource::extra`].
///
/// # Examples
///
/// ```
/// use gcstack_storage_core::state::BucketResource;
///
/// let bucket = BucketResource::new("photos", None, "STANDARD");
/// assert_eq!(bucket.id, "photos");
/// assert_eq!(bucket.location, "US");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketResource {
    /// Always [`BUCKET_KIND`].
    pub kind: String,
    /// Same as the name.
    pub id: String,
    /// Globally unique bucket name.
    pub name: String,
    /// Location constraint.
    pub location: String,
    /// Default storage class for new objects.
    pub storage_class: String,
    /// Creation timestamp (RFC 3339).
    pub time_created: String,
    /// Last update timestamp (RFC 3339).
    pub updated: String,
    /// Any other fields supplied at creation.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BucketResource {
    /// Build a new bucket resource stamped with the current time.
    #[must_use]
    pub fn new(name: &str, location: Option<&str>, storage_class: &str) -> Self {
        let now = timestamp_now();
        Self {
            kind: BUCKET_KIND.to_owned(),
            id: name.to_owned(),
            name: name.to_owned(),
            location: location.unwrap_or(DEFAULT_LOCATION).to_owned(),
            storage_class: storage_class.to_owned(),
            time_created: now.clone(),
            updated: now,
            extra: serde_json::Map::new(),
        }
    }
}

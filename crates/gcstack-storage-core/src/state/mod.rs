//! Catalog state: buckets, objects and in-flight upload sessions.
//!
//! - [`Catalog`] -- the authoritative, persisted record of everything below
//! - [`BucketResource`] -- bucket metadata
//! - [`ObjectResource`] / [`ObjectPatch`] -- object metadata and its writable subset
//! - [`ResumableUpload`] / [`MultipartUpload`] -- upload sessions
//!
//! # Thread Safety
//!
//! The catalog keeps its maps behind one `parking_lot::RwLock`. Mutations
//! hold the write lock for their whole duration, including the snapshot
//! rewrite; reads take the read lock and never observe a half-applied
//! change.

pub(crate) mod bucket;
pub(crate) mod catalog;
pub(crate) mod object;
pub(crate) mod session;

pub use bucket::{BUCKET_KIND, BucketResource, DEFAULT_LOCATION};
pub use catalog::{Catalog, CatalogState};
pub use object::{DEFAULT_STORAGE_CLASS, OBJECT_KIND, ObjectPatch, ObjectResource};
pub use session::{MAX_PART_NUMBER, MultipartUpload, ResumableUpload, part_key};

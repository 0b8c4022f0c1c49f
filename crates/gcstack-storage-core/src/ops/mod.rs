//! Storage engine operations.
//!
//! Each submodule adds an `impl` block to [`crate::provider::StorageEngine`]
//! for one family of operations. Validation of names happens here; the
//! [`crate::state::Catalog`] below assumes well-formed input.

pub mod bucket;
pub mod multipart;
pub mod object;
pub mod resumable;

pub use object::{ObjectRange, RewriteResponse};
pub use resumable::ChunkOutcome;

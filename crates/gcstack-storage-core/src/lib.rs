//! Cloud Storage emulator engine for gcstack.
//!
//! This crate holds everything below the HTTP layer of a local Cloud Storage
//! emulator: the persisted catalog of buckets, objects and upload sessions,
//! checksum validation, resumable and multipart upload state machines,
//! prefix/delimiter listing, and two interchangeable content stores (disk and
//! memory).
//!
//! # Architecture
//!
//! ```text
//! HTTP layer (routing, JSON/XML, headers)
//!        |
//!        v
//! StorageEngine (bucket / object / resumable / multipart ops)
//!        |
//!        v
//!   Catalog (buckets, objects, sessions, snapshot)
//!        |
//!        v
//!   ContentStore (disk or memory)
//! ```

pub mod checksums;
pub mod config;
pub mod error;
pub mod listing;
mod ops;
pub mod provider;
pub mod state;
pub mod storage;
pub mod utils;
pub mod validation;

pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use ops::{ChunkOutcome, ObjectRange, RewriteResponse};
pub use provider::StorageEngine;

//! End-to-end tests for the gcstack storage engine.
//!
//! Every scenario runs against both content stores: the in-memory backend
//! and a disk backend rooted in a fresh temporary directory.
//!
//! Run them with:
//! ```text
//! cargo test -p gcstack-integration
//! ```

use std::path::Path;
use std::sync::Once;

use gcstack_storage_core::{StorageConfig, StorageEngine};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Tracing filter: `rust_log` when given, otherwise the configured level.
fn log_filter(rust_log: Option<&str>, config: &StorageConfig) -> EnvFilter {
    EnvFilter::new(rust_log.unwrap_or(&config.log_level))
}

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        let rust_log = std::env::var("RUST_LOG").ok();
        tracing_subscriber::fmt()
            .with_env_filter(log_filter(rust_log.as_deref(), &StorageConfig::from_env()))
            .with_test_writer()
            .init();
    });
}

/// Content store selection for a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// In-memory content store.
    Memory,
    /// On-disk content store under a temporary directory.
    Disk,
}

impl Backend {
    /// Both backends, memory first.
    pub const ALL: [Self; 2] = [Self::Memory, Self::Disk];
}

/// An engine plus the temporary directory backing it (disk only).
#[derive(Debug)]
pub struct TestEngine {
    /// The engine under test.
    pub engine: StorageEngine,
    /// Keeps the disk root alive for the duration of the test.
    pub dir: Option<TempDir>,
}

impl TestEngine {
    /// Reopen the same storage root, as a restarted process would.
    ///
    /// The in-memory backend has nothing to reopen; its engine is returned
    /// as-is.
    #[must_use]
    pub fn reopen(&self) -> StorageEngine {
        match &self.dir {
            Some(dir) => open_disk(dir.path()),
            None => self.engine.clone(),
        }
    }
}

/// Open an engine on the given backend.
#[must_use]
pub fn engine(backend: Backend) -> TestEngine {
    init_tracing();
    match backend {
        Backend::Memory => TestEngine {
            engine: StorageEngine::open(StorageConfig::builder().in_memory(true).build())
                .expect("open in-memory engine"),
            dir: None,
        },
        Backend::Disk => {
            let dir = TempDir::new().expect("create temp dir");
            TestEngine {
                engine: open_disk(dir.path()),
                dir: Some(dir),
            }
        }
    }
}

/// Open a disk engine rooted at `root`.
#[must_use]
pub fn open_disk(root: &Path) -> StorageEngine {
    init_tracing();
    let config = StorageConfig::builder()
        .data_dir(root.to_path_buf())
        .build();
    StorageEngine::open(config).expect("open disk engine")
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Create a bucket and return its name.
pub fn create_test_bucket(engine: &StorageEngine, prefix: &str) -> String {
    let name = test_bucket_name(prefix);
    engine
        .create_bucket(&name, None)
        .unwrap_or_else(|e| panic!("failed to create bucket {name}: {e}"));
    name
}

/// Run `test` once per backend with a fresh engine.
pub fn for_each_backend(mut test: impl FnMut(Backend, &TestEngine)) {
    for backend in Backend::ALL {
        let engine = engine(backend);
        test(backend, &engine);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_filter_logs_by_configured_level() {
        let config = StorageConfig::builder().log_level("debug".into()).build();
        assert_eq!(log_filter(None, &config).to_string(), "debug");
        assert_eq!(log_filter(Some("warn"), &config).to_string(), "warn");
    }
}

mod test_bucket;
mod test_list;
mod test_object;
mod test_persistence;

//! Storage engine configuration.
//!
//! Provides [`StorageConfig`] for selecting the content backend and the
//! storage root. Values can be loaded from environment variables via
//! [`StorageConfig::from_env`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::StorageError;

/// Storage engine configuration.
///
/// # Examples
///
/// ```
/// use gcstack_storage_core::config::StorageConfig;
///
/// let config = StorageConfig::default();
/// assert_eq!(config.storage_dir, ".cloudstorage");
/// assert!(!config.in_memory);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Absolute root directory for the disk backend.
    #[builder(default = PathBuf::from("/var/lib/gcstack"))]
    pub data_dir: PathBuf,

    /// Keep all content and the catalog snapshot in memory.
    #[builder(default = false)]
    pub in_memory: bool,

    /// Sub-directory of `data_dir` holding buckets and the catalog snapshot.
    #[builder(default = String::from(".cloudstorage"))]
    pub storage_dir: String,

    /// Public base URL used to build object `mediaLink` values.
    #[builder(default = String::from("http://localhost:9023"))]
    pub base_url: String,

    /// Storage class assigned to new objects.
    #[builder(default = String::from("STANDARD"))]
    pub default_storage_class: String,

    /// Default tracing filter directive (e.g. `"info"`,
    /// `"gcstack_storage_core=debug"`).
    ///
    /// The engine never installs a subscriber itself; the hosting process
    /// hands this to `tracing_subscriber::EnvFilter` when `RUST_LOG` is unset.
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl StorageConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `STORAGE_BASE` | `/var/lib/gcstack` |
    /// | `STORAGE_IN_MEMORY` | `false` |
    /// | `STORAGE_DIR` | `.cloudstorage` |
    /// | `STORAGE_BASE_URL` | `http://localhost:9023` |
    /// | `DEFAULT_STORAGE_CLASS` | `STANDARD` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("STORAGE_BASE") {
            config.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("STORAGE_IN_MEMORY") {
            config.in_memory = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("STORAGE_DIR") {
            config.storage_dir = v;
        }
        if let Ok(v) = std::env::var("STORAGE_BASE_URL") {
            config.base_url = v;
        }
        if let Ok(v) = std::env::var("DEFAULT_STORAGE_CLASS") {
            config.default_storage_class = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Check the configuration before opening a storage root.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidArgument`] if the disk backend is
    /// selected with a relative `data_dir`, or if `storage_dir` or
    /// `log_level` is empty.
    pub fn validate(&self) -> Result<(), StorageError> {
        if !self.in_memory && !self.data_dir.is_absolute() {
            return Err(StorageError::invalid_argument(format!(
                "{} must be an absolute path",
                self.data_dir.display()
            )));
        }
        if self.storage_dir.is_empty() {
            return Err(StorageError::invalid_argument(
                "storage directory name must not be empty",
            ));
        }
        if self.log_level.trim().is_empty() {
            return Err(StorageError::invalid_argument(
                "log level filter must not be empty",
            ));
        }
        Ok(())
    }

    /// Directory holding bucket content and the catalog snapshot.
    #[must_use]
    pub fn storage_root(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.storage_dir)
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

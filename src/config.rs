//! Service configuration.
//!
//! Configuration is plain JSON:
//!
//! ```json
//! {
//!   "storages": [{ "name": "default", "path": "/var/opt/repositories" }],
//!   "chunk_size": 131072,
//!   "lfs_pointer_batch_size": 100
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Default upper bound on the data carried by one blob chunk (128 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 128 * 1024;

/// Default number of LFS pointers grouped into one response.
pub const DEFAULT_LFS_POINTER_BATCH_SIZE: usize = 100;

/// A named directory holding repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    pub name: String,
    pub path: PathBuf,
}

/// Settings shared by every request a server handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Storages repositories are looked up in.
    #[serde(default)]
    pub storages: Vec<Storage>,
    /// Maximum number of content bytes per streamed chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Maximum number of LFS pointers per response batch.
    #[serde(default = "default_lfs_pointer_batch_size")]
    pub lfs_pointer_batch_size: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_lfs_pointer_batch_size() -> usize {
    DEFAULT_LFS_POINTER_BATCH_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storages: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            lfs_pointer_batch_size: DEFAULT_LFS_POINTER_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Parse and validate a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Add a storage.
    pub fn with_storage(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.storages.push(Storage {
            name: name.to_string(),
            path: path.into(),
        });
        self
    }

    /// Set the maximum chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the number of LFS pointers per response batch.
    pub fn with_lfs_pointer_batch_size(mut self, batch_size: usize) -> Self {
        self.lfs_pointer_batch_size = batch_size;
        self
    }

    /// Look up a storage by name.
    pub fn storage(&self, name: &str) -> Option<&Storage> {
        self.storages.iter().find(|s| s.name == name)
    }

    /// Check that sizes are usable and storage names unique.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidArgument("chunk_size must be positive".into()));
        }
        if self.lfs_pointer_batch_size == 0 {
            return Err(Error::InvalidArgument(
                "lfs_pointer_batch_size must be positive".into(),
            ));
        }

        let mut names = HashSet::new();
        for storage in &self.storages {
            if storage.name.is_empty() {
                return Err(Error::InvalidArgument("storage with empty name".into()));
            }
            if !names.insert(storage.name.as_str()) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate storage {:?}",
                    storage.name
                )));
            }
        }
        Ok(())
    }
}

//! Mapping repository handles in requests to object stores.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path};

use crate::store::{MemoryStore, ObjectStore};
use crate::{Error, Result};

/// Identifies a repository as a storage name plus a path inside that storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryHandle {
    pub storage_name: String,
    pub relative_path: String,
}

impl RepositoryHandle {
    pub fn new(storage_name: &str, relative_path: &str) -> Self {
        RepositoryHandle {
            storage_name: storage_name.to_string(),
            relative_path: relative_path.to_string(),
        }
    }

    /// Reject empty fields and paths that would leave the storage.
    pub fn validate(&self) -> Result<()> {
        if self.storage_name.is_empty() {
            return Err(Error::InvalidArgument("empty storage name".into()));
        }
        if self.relative_path.is_empty() {
            return Err(Error::InvalidArgument("empty relative path".into()));
        }

        let escapes = Path::new(&self.relative_path).components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(Error::InvalidArgument(format!(
                "relative path escapes storage: {:?}",
                self.relative_path
            )));
        }
        Ok(())
    }
}

/// Opens the object store a repository handle refers to.
pub trait Locator {
    type Store: ObjectStore;

    /// Open the store for `repository`, which has already been validated.
    fn locate(&self, repository: &RepositoryHandle) -> Result<Self::Store>;
}

/// Locator over repositories held in memory.
#[derive(Clone, Default)]
pub struct MemoryLocator {
    repositories: HashMap<RepositoryHandle, MemoryStore>,
}

impl MemoryLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` under `storage_name`/`relative_path`.
    pub fn insert(&mut self, storage_name: &str, relative_path: &str, store: MemoryStore) {
        self.repositories
            .insert(RepositoryHandle::new(storage_name, relative_path), store);
    }

    /// Builder form of [`MemoryLocator::insert`].
    pub fn with_repository(
        mut self,
        storage_name: &str,
        relative_path: &str,
        store: MemoryStore,
    ) -> Self {
        self.insert(storage_name, relative_path, store);
        self
    }
}

impl Locator for MemoryLocator {
    type Store = MemoryStore;

    fn locate(&self, repository: &RepositoryHandle) -> Result<MemoryStore> {
        self.repositories.get(repository).cloned().ok_or_else(|| {
            Error::NotFound(format!(
                "repository not found: {}/{}",
                repository.storage_name, repository.relative_path
            ))
        })
    }
}

#[cfg(feature = "git2-integration")]
pub use git::GitLocator;

#[cfg(feature = "git2-integration")]
mod git {
    use super::{Locator, RepositoryHandle};
    use crate::config::Storage;
    use crate::store::GitStore;
    use crate::{Config, Error, Result};

    /// Locator opening repositories below configured storage directories.
    #[derive(Debug, Clone)]
    pub struct GitLocator {
        storages: Vec<Storage>,
    }

    impl GitLocator {
        pub fn new(storages: Vec<Storage>) -> Self {
            GitLocator { storages }
        }

        pub fn from_config(config: &Config) -> Self {
            Self::new(config.storages.clone())
        }
    }

    impl Locator for GitLocator {
        type Store = GitStore;

        fn locate(&self, repository: &RepositoryHandle) -> Result<GitStore> {
            let storage = self
                .storages
                .iter()
                .find(|s| s.name == repository.storage_name)
                .ok_or_else(|| {
                    Error::NotFound(format!("storage not found: {}", repository.storage_name))
                })?;

            let path = storage.path.join(&repository.relative_path);
            if !path.is_dir() {
                return Err(Error::NotFound(format!(
                    "repository not found: {}",
                    path.display()
                )));
            }
            GitStore::open(path)
        }
    }
}

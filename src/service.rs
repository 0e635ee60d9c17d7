//! Request handling for the blob operations.
//!
//! A [`BlobServer`] turns the repository named in a request into a
//! [`BlobService`] for that repository; the service then answers the
//! request with a lazy stream of responses.
//!
//! ```
//! use git2_blobs::{BlobServer, Config, GetBlobRequest, MemoryLocator, MemoryStore, RepositoryHandle};
//!
//! let mut store = MemoryStore::new();
//! let oid = store.add_blob("hello");
//! let locator = MemoryLocator::new().with_repository("default", "demo.git", store);
//! let server = BlobServer::new(locator, Config::default()).unwrap();
//!
//! let request = GetBlobRequest {
//!     repository: Some(RepositoryHandle::new("default", "demo.git")),
//!     oid: oid.to_string(),
//!     limit: None,
//! };
//! let service = server.open(request.repository.as_ref()).unwrap();
//! let blob = service.get_blob(&request).unwrap().into_blob().unwrap();
//! assert_eq!(blob.data, b"hello");
//! ```

use serde::{Deserialize, Serialize};

use crate::batcher::{BatchExt, Batched};
use crate::locator::{Locator, RepositoryHandle};
use crate::resolver::{self, BlobsStream};
use crate::scanner::{self, LfsPointerScan};
use crate::store::ObjectStore;
use crate::streamer::{self, BlobStream};
use crate::{Config, Error, LfsPointer, Limit, Result, RevisionPath};

/// Fetch one blob by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBlobRequest {
    pub repository: Option<RepositoryHandle>,
    pub oid: String,
    /// Content byte limit; absent or negative means unlimited.
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Fetch blobs by revision and path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBlobsRequest {
    pub repository: Option<RepositoryHandle>,
    pub revision_paths: Vec<RevisionPath>,
    /// Byte budget shared by all entries; absent or negative means unlimited.
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Classify exactly the given blobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLfsPointersRequest {
    pub repository: Option<RepositoryHandle>,
    pub blob_ids: Vec<String>,
}

/// Classify every object in the repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAllLfsPointersRequest {
    pub repository: Option<RepositoryHandle>,
}

/// Classify blobs reachable from the given revisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListLfsPointersRequest {
    pub repository: Option<RepositoryHandle>,
    pub revisions: Vec<String>,
    /// Maximum number of pointers; absent or non-positive means unlimited.
    #[serde(default)]
    pub limit: Option<i32>,
}

/// Classify every object in the repository, up to a limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAllLfsPointersRequest {
    pub repository: Option<RepositoryHandle>,
    #[serde(default)]
    pub limit: Option<i32>,
}

/// One response message of an LFS pointer operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LfsPointersResponse {
    pub lfs_pointers: Vec<LfsPointer>,
}

/// Stream of LFS pointer responses, each holding a bounded batch.
pub struct LfsPointerBatches<'a, S: ?Sized> {
    inner: Batched<LfsPointerScan<'a, S>>,
}

impl<S: ObjectStore + ?Sized> Iterator for LfsPointerBatches<'_, S> {
    type Item = Result<LfsPointersResponse>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|batch| batch.map(|lfs_pointers| LfsPointersResponse { lfs_pointers }))
    }
}

/// Entry point resolving repository handles for incoming requests.
pub struct BlobServer<L> {
    locator: L,
    config: Config,
}

impl<L: Locator> BlobServer<L> {
    /// Create a server after validating `config`.
    pub fn new(locator: L, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(BlobServer { locator, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open the repository a request names.
    ///
    /// A missing or malformed handle is `InvalidArgument`; a repository the
    /// locator cannot find is `NotFound`.
    pub fn open(&self, repository: Option<&RepositoryHandle>) -> Result<BlobService<L::Store>> {
        let repository =
            repository.ok_or_else(|| Error::InvalidArgument("empty Repository".into()))?;
        repository.validate()?;

        tracing::debug!(
            storage = %repository.storage_name,
            path = %repository.relative_path,
            "opening repository"
        );
        let store = self.locator.locate(repository)?;
        Ok(BlobService::new(store, &self.config))
    }
}

#[cfg(feature = "git2-integration")]
impl BlobServer<crate::locator::GitLocator> {
    /// Create a server for the on-disk storages listed in `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let locator = crate::locator::GitLocator::from_config(&config);
        Self::new(locator, config)
    }
}

/// The blob operations for one repository.
pub struct BlobService<S> {
    store: S,
    chunk_size: usize,
    lfs_pointer_batch_size: usize,
}

impl<S: ObjectStore> BlobService<S> {
    pub fn new(store: S, config: &Config) -> Self {
        BlobService {
            store,
            chunk_size: config.chunk_size,
            lfs_pointer_batch_size: config.lfs_pointer_batch_size,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stream one blob's content in chunks.
    pub fn get_blob(&self, request: &GetBlobRequest) -> Result<BlobStream<'_>> {
        let limit = request.limit.map_or(Limit::Unlimited, Limit::bytes);
        streamer::get_blob(&self.store, &request.oid, limit, self.chunk_size)
    }

    /// Stream the entries named by revision/path pairs.
    pub fn get_blobs(&self, request: &GetBlobsRequest) -> Result<BlobsStream<'_, S>> {
        let limit = request.limit.map_or(Limit::Unlimited, Limit::bytes);
        resolver::get_blobs(
            &self.store,
            request.revision_paths.clone(),
            limit,
            self.chunk_size,
        )
    }

    /// Stream the LFS pointers among the given blobs.
    pub fn get_lfs_pointers(
        &self,
        request: &GetLfsPointersRequest,
    ) -> Result<LfsPointerBatches<'_, S>> {
        let scan = scanner::get_lfs_pointers(&self.store, &request.blob_ids)?;
        Ok(self.batches(scan))
    }

    /// Stream every LFS pointer in the repository.
    pub fn get_all_lfs_pointers(
        &self,
        _request: &GetAllLfsPointersRequest,
    ) -> Result<LfsPointerBatches<'_, S>> {
        Ok(self.batches(scanner::get_all_lfs_pointers(&self.store)))
    }

    /// Stream LFS pointers reachable from the requested revisions.
    pub fn list_lfs_pointers(
        &self,
        request: &ListLfsPointersRequest,
    ) -> Result<LfsPointerBatches<'_, S>> {
        let limit = Limit::count(request.limit.unwrap_or(0).into());
        let scan = scanner::list_lfs_pointers(&self.store, request.revisions.clone(), limit)?;
        Ok(self.batches(scan))
    }

    /// Stream LFS pointers from the whole repository, up to the limit.
    pub fn list_all_lfs_pointers(
        &self,
        request: &ListAllLfsPointersRequest,
    ) -> Result<LfsPointerBatches<'_, S>> {
        let limit = Limit::count(request.limit.unwrap_or(0).into());
        Ok(self.batches(scanner::list_all_lfs_pointers(&self.store, limit)))
    }

    fn batches<'a>(&self, scan: LfsPointerScan<'a, S>) -> LfsPointerBatches<'a, S> {
        LfsPointerBatches {
            inner: scan.batched(self.lfs_pointer_batch_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Code, MemoryLocator, MemoryStore};

    fn server() -> BlobServer<MemoryLocator> {
        let mut store = MemoryStore::new();
        store.add_blob("hello");
        let locator = MemoryLocator::new().with_repository("default", "repo.git", store);
        BlobServer::new(locator, Config::default()).unwrap()
    }

    #[test]
    fn test_open_validates_handle() {
        let server = server();
        let code = |handle: Option<&RepositoryHandle>| server.open(handle).err().unwrap().code();

        assert_eq!(code(None), Code::InvalidArgument);
        assert_eq!(
            code(Some(&RepositoryHandle::new("default", "../repo.git"))),
            Code::InvalidArgument
        );
        assert_eq!(
            code(Some(&RepositoryHandle::new("default", "other.git"))),
            Code::NotFound
        );
        assert!(server
            .open(Some(&RepositoryHandle::new("default", "repo.git")))
            .is_ok());
    }

    #[test]
    fn test_requests_deserialize_with_absent_limits() {
        let request: GetBlobRequest = serde_json::from_str(
            r#"{"repository": {"storage_name": "default", "relative_path": "repo.git"},
                "oid": "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"}"#,
        )
        .unwrap();
        assert_eq!(request.limit, None);

        let request: ListAllLfsPointersRequest =
            serde_json::from_str(r#"{"repository": null, "limit": 5}"#).unwrap();
        assert_eq!(request.limit, Some(5));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config::default().with_chunk_size(0);
        assert!(BlobServer::new(MemoryLocator::new(), config).is_err());
    }
}

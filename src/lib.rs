//! # git2-blobs
//!
//! Read-side blob serving for git repositories.
//!
//! This crate provides:
//! - Streaming of blob content in bounded chunks, with byte limits
//! - Resolution of revision/path pairs to blobs, trees and submodules
//! - Scanning for Git LFS pointer blobs by id, by revision or across a whole
//!   object store
//! - An [`ObjectStore`] abstraction with in-memory and git2 backends
//!
//! ## Example
//!
//! ```
//! use git2_blobs::{list_lfs_pointers, Limit, MemoryStore, Pointer};
//! use git2_blobs::object::FILEMODE_BLOB;
//!
//! let mut store = MemoryStore::new();
//! let pointer = store.add_blob(Pointer::from_content(b"large file").encode_bytes());
//! let tree = store.add_tree([("large.bin", FILEMODE_BLOB, pointer.clone())]);
//! let commit = store.add_commit(&tree, "add large file");
//! store.set_ref("refs/heads/main", &commit);
//!
//! let found: Vec<_> = list_lfs_pointers(&store, vec!["main".into()], Limit::Unlimited)
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(found[0].oid, pointer);
//! ```

mod batcher;
mod config;
mod error;
mod limit;
mod locator;
pub mod object;
mod oid;
mod pointer;
mod resolver;
mod scanner;
mod service;
pub mod store;
mod streamer;

pub use batcher::{BatchExt, Batched};
pub use config::{Config, Storage, DEFAULT_CHUNK_SIZE, DEFAULT_LFS_POINTER_BATCH_SIZE};
pub use error::{Code, Error, Result};
pub use limit::Limit;
pub use locator::{Locator, MemoryLocator, RepositoryHandle};
pub use object::{Blob, ObjectId, ObjectInfo, ObjectType, RevisionPath, TreeEntry};
pub use oid::Oid;
pub use pointer::{
    classify, LfsPointer, Pointer, LFS_POINTER_MAX_SIZE, LFS_SPEC_V1, MAX_POINTER_SIZE,
};
pub use resolver::{
    get_blobs, resolve_path, BlobsStream, ResolvedBlobChunk, ResolvedBlobEntry, ResolvedObject,
};
pub use scanner::{
    get_all_lfs_pointers, get_lfs_pointers, list_all_lfs_pointers, list_lfs_pointers, Candidates,
    LfsPointerScan,
};
pub use service::{
    BlobServer, BlobService, GetAllLfsPointersRequest, GetBlobRequest, GetBlobsRequest,
    GetLfsPointersRequest, LfsPointerBatches, LfsPointersResponse, ListAllLfsPointersRequest,
    ListLfsPointersRequest,
};
pub use store::{MemoryStore, ObjectIds, ObjectStore};
pub use streamer::{get_blob, BlobChunk, BlobStream};

#[cfg(feature = "git2-integration")]
pub use locator::GitLocator;
#[cfg(feature = "git2-integration")]
pub use store::GitStore;

//! Read access to a git object database.
//!
//! Everything the streamer, resolver and scanner know about a repository
//! comes through [`ObjectStore`]. Implementations decide how objects are
//! located and cached; callers only ever read.

use std::io::Read;

use crate::{ObjectId, ObjectInfo, Result, TreeEntry};

mod memory;
pub use memory::MemoryStore;

#[cfg(feature = "git2-integration")]
mod git;
#[cfg(feature = "git2-integration")]
pub use git::GitStore;

#[cfg(test)]
mod counting;
#[cfg(test)]
pub(crate) use counting::CountingStore;

/// Lazily produced object ids, see [`ObjectStore::object_ids`].
pub type ObjectIds<'a> = Box<dyn Iterator<Item = Result<ObjectId>> + 'a>;

/// A content-addressed store of commits, trees, blobs and tags.
///
/// Lookups that find nothing return `Ok(None)`; `Err` is reserved for the
/// store itself failing.
pub trait ObjectStore {
    /// Read an object's header.
    fn info(&self, id: &ObjectId) -> Result<Option<ObjectInfo>>;

    /// Open a reader over at most the first `max_len` bytes of a blob.
    /// Returns `None` for missing objects and for objects that are not
    /// blobs.
    ///
    /// Implementations must not buffer more than `max_len` bytes of content
    /// on the caller's behalf.
    fn open_blob(&self, id: &ObjectId, max_len: u64) -> Result<Option<Box<dyn Read + '_>>>;

    /// Peel a revision to the id of its root tree.
    fn resolve_tree(&self, revision: &str) -> Result<Option<ObjectId>>;

    /// List a tree's entries in tree order.
    fn tree_entries(&self, tree: &ObjectId) -> Result<Option<Vec<TreeEntry>>>;

    /// Every object id in the store, sorted and without duplicates.
    fn object_ids(&self) -> Result<ObjectIds<'_>>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn info(&self, id: &ObjectId) -> Result<Option<ObjectInfo>> {
        (**self).info(id)
    }

    fn open_blob(&self, id: &ObjectId, max_len: u64) -> Result<Option<Box<dyn Read + '_>>> {
        (**self).open_blob(id, max_len)
    }

    fn resolve_tree(&self, revision: &str) -> Result<Option<ObjectId>> {
        (**self).resolve_tree(revision)
    }

    fn tree_entries(&self, tree: &ObjectId) -> Result<Option<Vec<TreeEntry>>> {
        (**self).tree_entries(tree)
    }

    fn object_ids(&self) -> Result<ObjectIds<'_>> {
        (**self).object_ids()
    }
}

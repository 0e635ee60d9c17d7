//! Scanning object stores for LFS pointer blobs.
//!
//! A scan walks a set of candidate objects and yields the blobs that pass
//! [`classify`](crate::pointer::classify). Candidates come from an explicit
//! id list, from the trees of a set of revisions, or from the whole store.
//! Objects that are not blobs, are missing, or are not pointers are skipped.
//!
//! Scans are lazy: each call to `next` reads only as far as the next match,
//! and only the first [`LFS_POINTER_MAX_SIZE`] bytes of any candidate are
//! ever read.

use std::collections::HashSet;
use std::io::Read;

use crate::object::validate_revision;
use crate::pointer::{classify, LFS_POINTER_MAX_SIZE};
use crate::store::{ObjectIds, ObjectStore};
use crate::{Error, LfsPointer, Limit, ObjectId, ObjectType, Result, TreeEntry};

/// Where a scan draws candidate objects from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidates {
    /// Exactly these objects, in this order.
    Ids(Vec<ObjectId>),
    /// Every blob in the trees of these revisions, depth-first in tree order.
    Revisions(Vec<String>),
    /// Every object in the store, in id order.
    All,
}

enum Source<'a> {
    Ids(std::vec::IntoIter<ObjectId>),
    Revisions {
        revisions: std::vec::IntoIter<String>,
        /// Entries left to visit in each tree on the current path.
        frames: Vec<std::vec::IntoIter<TreeEntry>>,
        seen_trees: HashSet<ObjectId>,
    },
    All(Option<ObjectIds<'a>>),
}

/// A lazy scan yielding LFS pointers.
pub struct LfsPointerScan<'a, S: ?Sized> {
    store: &'a S,
    source: Source<'a>,
    /// Blob ids already inspected during this scan.
    seen: HashSet<ObjectId>,
    limit: Limit,
    emitted: u64,
    done: bool,
}

impl<'a, S: ObjectStore + ?Sized> LfsPointerScan<'a, S> {
    /// Scan `candidates`, stopping after `limit` matches.
    pub fn new(store: &'a S, candidates: Candidates, limit: Limit) -> Self {
        let source = match candidates {
            Candidates::Ids(ids) => Source::Ids(ids.into_iter()),
            Candidates::Revisions(revisions) => Source::Revisions {
                revisions: revisions.into_iter(),
                frames: Vec::new(),
                seen_trees: HashSet::new(),
            },
            Candidates::All => Source::All(None),
        };

        LfsPointerScan {
            store,
            source,
            seen: HashSet::new(),
            limit,
            emitted: 0,
            done: false,
        }
    }

    fn next_candidate(&mut self) -> Option<Result<ObjectId>> {
        match &mut self.source {
            Source::Ids(ids) => ids.next().map(Ok),
            Source::All(ids) => {
                if ids.is_none() {
                    match self.store.object_ids() {
                        Ok(all) => *ids = Some(all),
                        Err(e) => return Some(Err(e)),
                    }
                }
                ids.as_mut()?.next()
            }
            Source::Revisions {
                revisions,
                frames,
                seen_trees,
            } => next_tree_blob(self.store, revisions, frames, seen_trees),
        }
    }

    fn classify_candidate(&self, id: &ObjectId) -> Result<Option<LfsPointer>> {
        let info = match self.store.info(id)? {
            Some(info) => info,
            None => return Ok(None),
        };
        if info.kind != ObjectType::Blob || info.size >= LFS_POINTER_MAX_SIZE {
            return Ok(None);
        }

        let reader = match self.store.open_blob(id, LFS_POINTER_MAX_SIZE)? {
            Some(reader) => reader,
            None => return Ok(None),
        };
        let mut data = Vec::with_capacity(info.size as usize);
        reader.take(LFS_POINTER_MAX_SIZE).read_to_end(&mut data)?;

        Ok(classify(id, info.size, &data))
    }

    fn fail(&mut self, err: Error) -> Option<Result<LfsPointer>> {
        tracing::warn!(error = %err, "LFS pointer scan aborted");
        self.done = true;
        Some(Err(err))
    }
}

/// Depth-first walk over the trees of each revision, yielding blob ids.
fn next_tree_blob<S: ObjectStore + ?Sized>(
    store: &S,
    revisions: &mut std::vec::IntoIter<String>,
    frames: &mut Vec<std::vec::IntoIter<TreeEntry>>,
    seen_trees: &mut HashSet<ObjectId>,
) -> Option<Result<ObjectId>> {
    loop {
        if let Some(frame) = frames.last_mut() {
            let entry = match frame.next() {
                Some(entry) => entry,
                None => {
                    frames.pop();
                    continue;
                }
            };

            match entry.kind {
                ObjectType::Blob => return Some(Ok(entry.id)),
                ObjectType::Tree if seen_trees.insert(entry.id.clone()) => {
                    match store.tree_entries(&entry.id) {
                        Ok(Some(entries)) => frames.push(entries.into_iter()),
                        Ok(None) => {}
                        Err(e) => return Some(Err(e)),
                    }
                }
                // Gitlinks and subtrees already walked.
                _ => {}
            }
            continue;
        }

        let revision = revisions.next()?;
        let tree = match store.resolve_tree(&revision) {
            Ok(Some(tree)) => tree,
            Ok(None) => {
                tracing::debug!(%revision, "skipping unresolved revision");
                continue;
            }
            Err(e) => return Some(Err(e)),
        };
        if !seen_trees.insert(tree.clone()) {
            continue;
        }
        match store.tree_entries(&tree) {
            Ok(Some(entries)) => frames.push(entries.into_iter()),
            Ok(None) => {}
            Err(e) => return Some(Err(e)),
        }
    }
}

impl<S: ObjectStore + ?Sized> Iterator for LfsPointerScan<'_, S> {
    type Item = Result<LfsPointer>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.limit.is_reached(self.emitted) {
            return None;
        }

        loop {
            let id = match self.next_candidate() {
                Some(Ok(id)) => id,
                Some(Err(e)) => return self.fail(e),
                None => {
                    self.done = true;
                    return None;
                }
            };

            // Ids from the whole store are already unique.
            let dedup = !matches!(self.source, Source::All(_));
            if dedup && !self.seen.insert(id.clone()) {
                continue;
            }

            match self.classify_candidate(&id) {
                Ok(Some(pointer)) => {
                    self.emitted += 1;
                    return Some(Ok(pointer));
                }
                Ok(None) => continue,
                Err(e) => return self.fail(e),
            }
        }
    }
}

/// Scan exactly the given blob ids.
///
/// Fails with `InvalidArgument` when no ids are given or one is malformed.
pub fn get_lfs_pointers<'a, S: ObjectStore + ?Sized>(
    store: &'a S,
    blob_ids: &[String],
) -> Result<LfsPointerScan<'a, S>> {
    if blob_ids.is_empty() {
        return Err(Error::InvalidArgument("empty BlobIds".into()));
    }
    let ids = blob_ids
        .iter()
        .map(|id| ObjectId::parse(id))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(candidates = ids.len(), "scanning blob ids for LFS pointers");
    Ok(LfsPointerScan::new(store, Candidates::Ids(ids), Limit::Unlimited))
}

/// Scan every object in the store, without a limit.
pub fn get_all_lfs_pointers<S: ObjectStore + ?Sized>(store: &S) -> LfsPointerScan<'_, S> {
    tracing::debug!("scanning all objects for LFS pointers");
    LfsPointerScan::new(store, Candidates::All, Limit::Unlimited)
}

/// Scan the blobs reachable from the trees of `revisions`.
///
/// Fails with `InvalidArgument` when no revisions are given or one is
/// malformed. Revisions that do not resolve are skipped.
pub fn list_lfs_pointers<S: ObjectStore + ?Sized>(
    store: &S,
    revisions: Vec<String>,
    limit: Limit,
) -> Result<LfsPointerScan<'_, S>> {
    if revisions.is_empty() {
        return Err(Error::InvalidArgument("missing revisions".into()));
    }
    for revision in &revisions {
        validate_revision(revision)?;
    }

    tracing::debug!(revisions = revisions.len(), ?limit, "listing LFS pointers");
    Ok(LfsPointerScan::new(store, Candidates::Revisions(revisions), limit))
}

/// Scan every object in the store, stopping after `limit` matches.
pub fn list_all_lfs_pointers<S: ObjectStore + ?Sized>(
    store: &S,
    limit: Limit,
) -> LfsPointerScan<'_, S> {
    tracing::debug!(?limit, "listing all LFS pointers");
    LfsPointerScan::new(store, Candidates::All, limit)
}

//! Resolving revision/path pairs to blobs.
//!
//! Every pair is resolved on its own. Pairs that do not resolve are left out
//! of the output instead of failing the batch.
//!
//! The byte limit is a budget shared by the whole batch and spent in input
//! order: each blob receives `min(size, remaining)` bytes, and once the
//! budget is gone later entries are still reported, with metadata only.

use serde::Serialize;

use crate::object::validate_revision;
use crate::store::ObjectStore;
use crate::streamer::ChunkReader;
use crate::{Blob, Error, Limit, ObjectId, ObjectType, Result, RevisionPath};

/// What a revision/path pair resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedObject {
    pub oid: ObjectId,
    #[serde(rename = "type")]
    pub kind: ObjectType,
    pub mode: i32,
    /// Object size; zero for submodules.
    pub size: i64,
    pub is_submodule: bool,
    pub revision: String,
    pub path: Vec<u8>,
}

/// One slice of a resolved entry's content.
///
/// An entry starts with the chunk whose `offset` is zero; submodules, trees
/// and entries past the byte budget consist of that chunk alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedBlobChunk {
    #[serde(flatten)]
    pub object: ResolvedObject,
    pub offset: u64,
    pub data: Vec<u8>,
}

/// A resolved entry with all of its streamed content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBlobEntry {
    pub blob: Blob,
    pub is_submodule: bool,
    pub mode: i32,
    pub revision: String,
    pub path: Vec<u8>,
    pub kind: ObjectType,
}

impl ResolvedBlobEntry {
    fn start(object: ResolvedObject) -> Self {
        ResolvedBlobEntry {
            blob: Blob {
                id: object.oid,
                size: object.size,
                data: Vec::new(),
            },
            is_submodule: object.is_submodule,
            mode: object.mode,
            revision: object.revision,
            path: object.path,
            kind: object.kind,
        }
    }
}

/// Resolve one revision/path pair.
///
/// Returns `None` when the revision, or any component of the path, does not
/// exist.
pub fn resolve_path<S: ObjectStore + ?Sized>(
    store: &S,
    revision_path: &RevisionPath,
) -> Result<Option<ResolvedObject>> {
    let mut tree = match store.resolve_tree(&revision_path.revision)? {
        Some(tree) => tree,
        None => return Ok(None),
    };

    let components: Vec<&[u8]> = revision_path
        .path
        .split(|b| *b == b'/')
        .filter(|c| !c.is_empty())
        .collect();
    let (last, parents) = match components.split_last() {
        Some(split) => split,
        None => return Ok(None),
    };

    for component in parents {
        let entry = match find_entry(store, &tree, component)? {
            Some(entry) => entry,
            None => return Ok(None),
        };
        if entry.kind != ObjectType::Tree {
            return Ok(None);
        }
        tree = entry.id;
    }

    let entry = match find_entry(store, &tree, last)? {
        Some(entry) => entry,
        None => return Ok(None),
    };

    if entry.is_gitlink() {
        return Ok(Some(ResolvedObject {
            oid: entry.id,
            kind: ObjectType::Commit,
            mode: entry.mode,
            size: 0,
            is_submodule: true,
            revision: revision_path.revision.clone(),
            path: revision_path.path.clone(),
        }));
    }

    let info = match store.info(&entry.id)? {
        Some(info) => info,
        None => return Ok(None),
    };
    Ok(Some(ResolvedObject {
        oid: info.id,
        kind: info.kind,
        mode: entry.mode,
        size: info.size as i64,
        is_submodule: false,
        revision: revision_path.revision.clone(),
        path: revision_path.path.clone(),
    }))
}

fn find_entry<S: ObjectStore + ?Sized>(
    store: &S,
    tree: &ObjectId,
    name: &[u8],
) -> Result<Option<crate::TreeEntry>> {
    Ok(store
        .tree_entries(tree)?
        .and_then(|entries| entries.into_iter().find(|e| e.name == name)))
}

/// Lazily resolved and streamed entries of a batch request.
pub struct BlobsStream<'a, S: ?Sized> {
    store: &'a S,
    pending: std::vec::IntoIter<RevisionPath>,
    budget: Limit,
    chunk_size: usize,
    current: Option<(ResolvedObject, ChunkReader<'a>)>,
    failed: bool,
}

impl<'a, S: ObjectStore + ?Sized> BlobsStream<'a, S> {
    /// Drain the stream, reassembling chunks into entries.
    pub fn collect_entries(self) -> Result<Vec<ResolvedBlobEntry>> {
        let mut entries: Vec<ResolvedBlobEntry> = Vec::new();
        for chunk in self {
            let chunk = chunk?;
            match entries.last_mut() {
                Some(entry) if chunk.offset > 0 => entry.blob.data.extend_from_slice(&chunk.data),
                _ => {
                    let mut entry = ResolvedBlobEntry::start(chunk.object);
                    entry.blob.data = chunk.data;
                    entries.push(entry);
                }
            }
        }
        Ok(entries)
    }

    fn start_entry(
        &mut self,
        revision_path: RevisionPath,
    ) -> Result<Option<(ResolvedObject, ChunkReader<'a>)>> {
        let object = match resolve_path(self.store, &revision_path)? {
            Some(object) => object,
            None => {
                tracing::debug!(
                    revision = %revision_path.revision,
                    path = %String::from_utf8_lossy(&revision_path.path),
                    "skipping unresolved revision path"
                );
                return Ok(None);
            }
        };

        if object.kind != ObjectType::Blob {
            return Ok(Some((object, ChunkReader::new(None, 0, self.chunk_size))));
        }

        let read_limit = self.budget.cap(object.size as u64);
        if let Limit::AtMost(left) = self.budget {
            self.budget = Limit::AtMost(left - read_limit);
        }

        let reader = if read_limit == 0 {
            None
        } else {
            let reader = self.store.open_blob(&object.oid, read_limit)?.ok_or_else(|| {
                Error::Corrupt(format!("blob {} listed but unreadable", object.oid))
            })?;
            Some(reader)
        };

        Ok(Some((object, ChunkReader::new(reader, read_limit, self.chunk_size))))
    }
}

impl<S: ObjectStore + ?Sized> Iterator for BlobsStream<'_, S> {
    type Item = Result<ResolvedBlobChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            if let Some((object, chunks)) = self.current.as_mut() {
                match chunks.next_chunk() {
                    Some(Ok((offset, data))) => {
                        return Some(Ok(ResolvedBlobChunk {
                            object: object.clone(),
                            offset,
                            data,
                        }));
                    }
                    Some(Err(e)) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                    None => {}
                }
            }

            let revision_path = self.pending.next()?;
            match self.start_entry(revision_path) {
                Ok(entry) => self.current = entry,
                Err(e) => {
                    tracing::warn!(error = %e, "object store failed while resolving blobs");
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Start resolving `revision_paths`, sharing a byte `limit` across the batch.
///
/// The request fails up front with `InvalidArgument` when it is empty or
/// any revision is malformed.
pub fn get_blobs<S: ObjectStore + ?Sized>(
    store: &S,
    revision_paths: Vec<RevisionPath>,
    limit: Limit,
    chunk_size: usize,
) -> Result<BlobsStream<'_, S>> {
    if revision_paths.is_empty() {
        return Err(Error::InvalidArgument("empty RevisionPaths".into()));
    }
    for revision_path in &revision_paths {
        validate_revision(&revision_path.revision)?;
    }

    tracing::debug!(entries = revision_paths.len(), ?limit, "resolving blobs");

    Ok(BlobsStream {
        store,
        pending: revision_paths.into_iter(),
        budget: limit,
        chunk_size,
        current: None,
        failed: false,
    })
}

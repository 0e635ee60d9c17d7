//! In-memory object store.
//!
//! Objects are hashed the way git's SHA-256 object format hashes them
//! (`<type> <len>\0<payload>`), so ids are stable across runs.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::sync::Arc;

use super::{ObjectIds, ObjectStore};
use crate::object::{FILEMODE_GITLINK, FILEMODE_TREE};
use crate::{ObjectId, ObjectInfo, ObjectType, Result, TreeEntry};

#[derive(Clone)]
enum Stored {
    Blob(Vec<u8>),
    Tree { entries: Vec<TreeEntry>, size: u64 },
    Commit { tree: ObjectId, size: u64 },
    Tag { target: ObjectId, size: u64 },
}

impl Stored {
    fn kind(&self) -> ObjectType {
        match self {
            Stored::Blob(_) => ObjectType::Blob,
            Stored::Tree { .. } => ObjectType::Tree,
            Stored::Commit { .. } => ObjectType::Commit,
            Stored::Tag { .. } => ObjectType::Tag,
        }
    }

    fn size(&self) -> u64 {
        match self {
            Stored::Blob(data) => data.len() as u64,
            Stored::Tree { size, .. } | Stored::Commit { size, .. } | Stored::Tag { size, .. } => {
                *size
            }
        }
    }
}

#[derive(Clone, Default)]
struct MemoryStoreInner {
    objects: BTreeMap<ObjectId, Stored>,
    refs: HashMap<String, ObjectId>,
}

/// Object store held entirely in memory.
///
/// This type is cheaply cloneable - clones share objects until one of them
/// is modified.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a blob and return its id.
    pub fn add_blob(&mut self, data: impl Into<Vec<u8>>) -> ObjectId {
        let data = data.into();
        let id = hash_object(ObjectType::Blob, &data);
        self.insert(id.clone(), Stored::Blob(data));
        id
    }

    /// Add a tree from `(name, mode, id)` entries and return its id.
    ///
    /// Entries are sorted into git tree order. Gitlink entries may point at
    /// commits that are not in this store.
    pub fn add_tree<N: Into<Vec<u8>>>(
        &mut self,
        entries: impl IntoIterator<Item = (N, i32, ObjectId)>,
    ) -> ObjectId {
        let mut entries: Vec<TreeEntry> = entries
            .into_iter()
            .map(|(name, mode, id)| TreeEntry {
                name: name.into(),
                mode,
                id,
                kind: kind_for_mode(mode),
            })
            .collect();
        entries.sort_by(|a, b| tree_sort_key(a).cmp(&tree_sort_key(b)));

        let mut payload = Vec::new();
        for entry in &entries {
            payload.extend_from_slice(format!("{:o} ", entry.mode).as_bytes());
            payload.extend_from_slice(&entry.name);
            payload.push(0);
            // Ids are validated hex, decoding cannot fail.
            payload.extend(hex::decode(entry.id.as_str()).unwrap_or_default());
        }

        let id = hash_object(ObjectType::Tree, &payload);
        let size = payload.len() as u64;
        self.insert(id.clone(), Stored::Tree { entries, size });
        id
    }

    /// Add a root commit for `tree` and return its id.
    pub fn add_commit(&mut self, tree: &ObjectId, message: &str) -> ObjectId {
        let payload = format!(
            "tree {}\nauthor Blob Tests <tests@example.com> 0 +0000\n\
             committer Blob Tests <tests@example.com> 0 +0000\n\n{}\n",
            tree, message
        );
        let id = hash_object(ObjectType::Commit, payload.as_bytes());
        self.insert(
            id.clone(),
            Stored::Commit {
                tree: tree.clone(),
                size: payload.len() as u64,
            },
        );
        id
    }

    /// Add an annotated tag pointing at `target` and return its id.
    pub fn add_tag(&mut self, target: &ObjectId, name: &str) -> ObjectId {
        let kind = self
            .inner
            .objects
            .get(target)
            .map(Stored::kind)
            .unwrap_or(ObjectType::Commit);
        let payload = format!("object {}\ntype {}\ntag {}\n\n", target, kind, name);
        let id = hash_object(ObjectType::Tag, payload.as_bytes());
        self.insert(
            id.clone(),
            Stored::Tag {
                target: target.clone(),
                size: payload.len() as u64,
            },
        );
        id
    }

    /// Point a reference such as `refs/heads/main` or `HEAD` at an object.
    pub fn set_ref(&mut self, name: &str, target: &ObjectId) {
        Arc::make_mut(&mut self.inner)
            .refs
            .insert(name.to_string(), target.clone());
    }

    /// Number of objects held.
    pub fn len(&self) -> usize {
        self.inner.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.objects.is_empty()
    }

    fn insert(&mut self, id: ObjectId, object: Stored) {
        Arc::make_mut(&mut self.inner).objects.insert(id, object);
    }

    fn lookup_revision(&self, revision: &str) -> Option<ObjectId> {
        let refs = &self.inner.refs;
        for candidate in [
            revision.to_string(),
            format!("refs/{}", revision),
            format!("refs/tags/{}", revision),
            format!("refs/heads/{}", revision),
        ] {
            if let Some(id) = refs.get(&candidate) {
                return Some(id.clone());
            }
        }

        ObjectId::parse(revision)
            .ok()
            .filter(|id| self.inner.objects.contains_key(id))
    }
}

impl ObjectStore for MemoryStore {
    fn info(&self, id: &ObjectId) -> Result<Option<ObjectInfo>> {
        Ok(self.inner.objects.get(id).map(|object| ObjectInfo {
            id: id.clone(),
            kind: object.kind(),
            size: object.size(),
        }))
    }

    fn open_blob(&self, id: &ObjectId, max_len: u64) -> Result<Option<Box<dyn Read + '_>>> {
        match self.inner.objects.get(id) {
            Some(Stored::Blob(data)) => {
                let len = usize::try_from(max_len).map_or(data.len(), |max| data.len().min(max));
                Ok(Some(Box::new(&data[..len])))
            }
            _ => Ok(None),
        }
    }

    fn resolve_tree(&self, revision: &str) -> Result<Option<ObjectId>> {
        let mut current = match self.lookup_revision(revision) {
            Some(id) => id,
            None => return Ok(None),
        };

        // Peel tags and commits down to a tree.
        loop {
            match self.inner.objects.get(&current) {
                Some(Stored::Tree { .. }) => return Ok(Some(current)),
                Some(Stored::Commit { tree, .. }) => current = tree.clone(),
                Some(Stored::Tag { target, .. }) => current = target.clone(),
                Some(Stored::Blob(_)) | None => return Ok(None),
            }
        }
    }

    fn tree_entries(&self, tree: &ObjectId) -> Result<Option<Vec<TreeEntry>>> {
        match self.inner.objects.get(tree) {
            Some(Stored::Tree { entries, .. }) => Ok(Some(entries.clone())),
            _ => Ok(None),
        }
    }

    fn object_ids(&self) -> Result<ObjectIds<'_>> {
        Ok(Box::new(self.inner.objects.keys().cloned().map(Ok)))
    }
}

fn hash_object(kind: ObjectType, payload: &[u8]) -> ObjectId {
    let mut hasher = Sha256::new();
    hasher.update(format!("{} {}\0", kind, payload.len()).as_bytes());
    hasher.update(payload);
    ObjectId::from_sha256(hasher.finalize().into())
}

fn kind_for_mode(mode: i32) -> ObjectType {
    match mode {
        FILEMODE_GITLINK => ObjectType::Commit,
        FILEMODE_TREE => ObjectType::Tree,
        _ => ObjectType::Blob,
    }
}

/// Git sorts tree entries as if subtree names ended in `/`.
fn tree_sort_key(entry: &TreeEntry) -> Vec<u8> {
    let mut key = entry.name.clone();
    if entry.mode == FILEMODE_TREE {
        key.push(b'/');
    }
    key
}

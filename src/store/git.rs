//! Object store backed by a git2 repository.

use git2::{ErrorCode, Repository};
use std::io::{Cursor, Read};
use std::path::Path;

use super::{ObjectIds, ObjectStore};
use crate::{Error, ObjectId, ObjectInfo, ObjectType, Result, TreeEntry};

/// Object store reading loose and packed objects through libgit2.
///
/// Headers are read without inflating content. Blob readers hold at most the
/// requested prefix: loose objects are inflated incrementally up to it, while
/// packed objects, which libgit2 cannot stream, are inflated and then cut
/// down before being handed out.
pub struct GitStore {
    repo: Repository,
}

impl GitStore {
    /// Open the repository at `path` (bare or with a work tree).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match Repository::open(path) {
            Ok(repo) => Ok(GitStore { repo }),
            Err(e) if e.code() == ErrorCode::NotFound => Err(Error::NotFound(format!(
                "repository not found: {}",
                path.display()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Wrap an already opened repository.
    pub fn from_repository(repo: Repository) -> Self {
        GitStore { repo }
    }

    /// Get a reference to the underlying repository.
    pub fn repository(&self) -> &Repository {
        &self.repo
    }
}

impl ObjectStore for GitStore {
    fn info(&self, id: &ObjectId) -> Result<Option<ObjectInfo>> {
        let oid = match to_git_oid(id) {
            Some(oid) => oid,
            None => return Ok(None),
        };

        let odb = self.repo.odb()?;
        let (size, kind) = match missing_as_none(odb.read_header(oid))? {
            Some(header) => header,
            None => return Ok(None),
        };

        Ok(from_git_kind(kind).map(|kind| ObjectInfo {
            id: id.clone(),
            kind,
            size: size as u64,
        }))
    }

    fn open_blob(&self, id: &ObjectId, max_len: u64) -> Result<Option<Box<dyn Read + '_>>> {
        let oid = match to_git_oid(id) {
            Some(oid) => oid,
            None => return Ok(None),
        };

        let odb = self.repo.odb()?;
        let prefix_len = |size: usize| usize::try_from(max_len).map_or(size, |max| size.min(max));

        if let Ok((mut reader, size, kind)) = odb.reader(oid) {
            if kind != git2::ObjectType::Blob {
                return Ok(None);
            }
            // OdbReader reports the requested length as read, so never ask
            // for more than the object holds.
            let mut data = vec![0; prefix_len(size)];
            reader.read_exact(&mut data)?;
            return Ok(Some(Box::new(Cursor::new(data))));
        }

        let object = match missing_as_none(odb.read(oid))? {
            Some(object) => object,
            None => return Ok(None),
        };
        if object.kind() != git2::ObjectType::Blob {
            return Ok(None);
        }

        let data = object.data();
        Ok(Some(Box::new(Cursor::new(data[..prefix_len(data.len())].to_vec()))))
    }

    fn resolve_tree(&self, revision: &str) -> Result<Option<ObjectId>> {
        let object = match missing_as_none(self.repo.revparse_single(revision))? {
            Some(object) => object,
            None => return Ok(None),
        };
        let tree = match missing_as_none(object.peel_to_tree())? {
            Some(tree) => tree,
            None => return Ok(None),
        };
        Ok(Some(from_git_oid(tree.id())?))
    }

    fn tree_entries(&self, tree: &ObjectId) -> Result<Option<Vec<TreeEntry>>> {
        let oid = match to_git_oid(tree) {
            Some(oid) => oid,
            None => return Ok(None),
        };
        let tree = match missing_as_none(self.repo.find_tree(oid))? {
            Some(tree) => tree,
            None => return Ok(None),
        };

        let mut entries = Vec::with_capacity(tree.len());
        for entry in tree.iter() {
            let kind = match entry.kind().and_then(from_git_kind) {
                Some(kind) => kind,
                None => {
                    return Err(Error::Corrupt(format!(
                        "tree entry {:?} has no object type",
                        String::from_utf8_lossy(entry.name_bytes())
                    )))
                }
            };
            entries.push(TreeEntry {
                name: entry.name_bytes().to_vec(),
                mode: entry.filemode(),
                id: from_git_oid(entry.id())?,
                kind,
            });
        }
        Ok(Some(entries))
    }

    fn object_ids(&self) -> Result<ObjectIds<'_>> {
        // Raw oids are kept until the scan asks for them; hex ids are built
        // one at a time.
        let odb = self.repo.odb()?;
        let mut raw = Vec::new();
        odb.foreach(|oid| {
            raw.push(*oid);
            true
        })?;

        // An object can live in several packs and loose at the same time.
        raw.sort_unstable();
        raw.dedup();

        Ok(Box::new(raw.into_iter().map(from_git_oid)))
    }
}

/// Treat lookups that found nothing as absent rather than failed.
fn missing_as_none<T>(result: std::result::Result<T, git2::Error>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e)
            if matches!(
                e.code(),
                ErrorCode::NotFound | ErrorCode::InvalidSpec | ErrorCode::Peel | ErrorCode::Ambiguous
            ) =>
        {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn to_git_oid(id: &ObjectId) -> Option<git2::Oid> {
    git2::Oid::from_str(id.as_str()).ok()
}

fn from_git_oid(oid: git2::Oid) -> Result<ObjectId> {
    ObjectId::from_raw(oid.as_bytes())
}

fn from_git_kind(kind: git2::ObjectType) -> Option<ObjectType> {
    match kind {
        git2::ObjectType::Commit => Some(ObjectType::Commit),
        git2::ObjectType::Tree => Some(ObjectType::Tree),
        git2::ObjectType::Blob => Some(ObjectType::Blob),
        git2::ObjectType::Tag => Some(ObjectType::Tag),
        git2::ObjectType::Any => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo_init() -> (TempDir, Repository) {
        let td = TempDir::new().unwrap();
        let repo = Repository::init_bare(td.path()).unwrap();
        (td, repo)
    }

    #[test]
    fn test_info_and_read() {
        let (_td, repo) = repo_init();
        let oid = repo.blob(b"Hello, World!").unwrap();
        let store = GitStore::from_repository(repo);

        let id = ObjectId::parse(&oid.to_string()).unwrap();
        let info = store.info(&id).unwrap().unwrap();
        assert_eq!(info.kind, ObjectType::Blob);
        assert_eq!(info.size, 13);

        let read = |max_len: u64| {
            let mut data = Vec::new();
            store
                .open_blob(&id, max_len)
                .unwrap()
                .unwrap()
                .read_to_end(&mut data)
                .unwrap();
            data
        };
        assert_eq!(read(u64::MAX), b"Hello, World!");
        assert_eq!(read(5), b"Hello");
        assert_eq!(read(0), b"");
    }

    #[test]
    fn test_missing_objects_are_none() {
        let (_td, repo) = repo_init();
        let store = GitStore::from_repository(repo);

        let id = ObjectId::parse("0000000000000000000000000000000000000001").unwrap();
        assert!(store.info(&id).unwrap().is_none());
        assert!(store.open_blob(&id, u64::MAX).unwrap().is_none());
        assert!(store.tree_entries(&id).unwrap().is_none());
        assert!(store.resolve_tree("refs/heads/nope").unwrap().is_none());
    }

    #[test]
    fn test_open_missing_repository() {
        let td = TempDir::new().unwrap();
        let err = GitStore::open(td.path().join("absent.git")).err().unwrap();
        assert_eq!(err.code(), crate::Code::NotFound);
    }
}

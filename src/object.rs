//! Git object identities and the read-only shapes built from the object store.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// File mode of a tree entry that points at a submodule commit.
pub const FILEMODE_GITLINK: i32 = 0o160000;
/// File mode of a subtree entry.
pub const FILEMODE_TREE: i32 = 0o040000;
/// File mode of a regular, non-executable file.
pub const FILEMODE_BLOB: i32 = 0o100644;

/// A git object id in lowercase hex (SHA-1 or SHA-256 object format).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Length in hex characters of a SHA-1 object id.
    pub const SHA1_HEX_LEN: usize = 40;
    /// Length in hex characters of a SHA-256 object id.
    pub const SHA256_HEX_LEN: usize = 64;

    /// Parse an object id, accepting either case but storing lowercase.
    pub fn parse(hex: &str) -> Result<Self> {
        if hex.len() != Self::SHA1_HEX_LEN && hex.len() != Self::SHA256_HEX_LEN {
            return Err(Error::InvalidArgument(format!(
                "invalid object id {:?}: expected {} or {} hex chars",
                hex,
                Self::SHA1_HEX_LEN,
                Self::SHA256_HEX_LEN
            )));
        }
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidArgument(format!(
                "invalid object id {:?}: not hex",
                hex
            )));
        }
        Ok(ObjectId(hex.to_ascii_lowercase()))
    }

    /// Build an object id from raw hash bytes.
    pub fn from_raw(bytes: &[u8]) -> Result<Self> {
        ObjectId::parse(&hex::encode(bytes))
    }

    /// Build an object id from a SHA-256 digest.
    pub fn from_sha256(digest: [u8; 32]) -> Self {
        ObjectId(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl std::str::FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ObjectId::parse(s)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        ObjectId::parse(&value)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

/// The four kinds of object a git object store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl ObjectType {
    /// The name git uses for this type in object headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Commit => "commit",
            ObjectType::Tree => "tree",
            ObjectType::Blob => "blob",
            ObjectType::Tag => "tag",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object header: id, type and size, without content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub kind: ObjectType,
    pub size: u64,
}

/// One entry of a tree object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Raw entry name; not necessarily valid UTF-8.
    pub name: Vec<u8>,
    pub mode: i32,
    pub id: ObjectId,
    pub kind: ObjectType,
}

impl TreeEntry {
    /// Whether the entry references a submodule commit.
    pub fn is_gitlink(&self) -> bool {
        self.mode == FILEMODE_GITLINK
    }
}

/// Blob content as delivered to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blob {
    pub id: ObjectId,
    /// Full size of the blob, even when `data` was cut short by a limit.
    pub size: i64,
    pub data: Vec<u8>,
}

/// A revision and a path inside its tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionPath {
    pub revision: String,
    /// Raw path bytes, `/`-separated.
    pub path: Vec<u8>,
}

impl RevisionPath {
    pub fn new(revision: impl Into<String>, path: impl Into<Vec<u8>>) -> Self {
        RevisionPath {
            revision: revision.into(),
            path: path.into(),
        }
    }
}

/// Reject revisions that are empty or would be read as command-line options.
pub fn validate_revision(revision: &str) -> Result<()> {
    if revision.is_empty() {
        return Err(Error::InvalidArgument("empty revision".into()));
    }
    if revision.starts_with('-') {
        return Err(Error::InvalidArgument(format!(
            "revision can't start with '-': {:?}",
            revision
        )));
    }
    if revision.contains('\0') || revision.contains('\n') {
        return Err(Error::InvalidArgument(format!(
            "revision contains control characters: {:?}",
            revision
        )));
    }
    Ok(())
}

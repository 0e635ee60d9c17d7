//! LFS pointer file format and classification.
//!
//! LFS pointer files are small text blobs committed in place of large files.
//! They name the large file by its SHA256 hash and size.

use serde::Serialize;
use std::collections::HashSet;

use crate::{Error, ObjectId, Oid, Result};

/// LFS specification version.
pub const LFS_SPEC_V1: &str = "https://git-lfs.github.com/spec/v1";

/// Version URL written by pre-release clients.
pub const HAWSER_SPEC_V1: &str = "https://hawser.github.com/spec/v1";

/// Prefix every blob classified as a pointer must start with.
pub const POINTER_SIGNATURE: &[u8] = b"version https://git-lfs.github.com/spec";

/// Blobs of this size or larger are never classified as pointers.
pub const LFS_POINTER_MAX_SIZE: u64 = 200;

/// Largest text [`Pointer::parse`] accepts. Pointers carrying extension
/// lines can exceed [`LFS_POINTER_MAX_SIZE`] and still parse.
pub const MAX_POINTER_SIZE: usize = 1024;

/// The large file a pointer references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointer {
    /// The SHA256 hash of the file content.
    oid: Oid,
    /// The size of the file in bytes.
    size: u64,
}

impl Pointer {
    /// Create a pointer describing `content`.
    pub fn from_content(content: &[u8]) -> Self {
        Pointer {
            oid: Oid::from_content(content),
            size: content.len() as u64,
        }
    }

    /// Parse a pointer from its text representation.
    ///
    /// Every non-empty line must be a `key value` pair with a lowercase key,
    /// the first one being `version`. Unknown keys are allowed, duplicates are
    /// not.
    pub fn parse(content: &[u8]) -> Result<Self> {
        if content.len() > MAX_POINTER_SIZE {
            return Err(Error::InvalidPointer(
                "content too large to be a pointer".into(),
            ));
        }

        let text = std::str::from_utf8(content)
            .map_err(|_| Error::InvalidPointer("invalid UTF-8".into()))?;

        let mut seen = HashSet::new();
        let mut oid: Option<Oid> = None;
        let mut size: Option<u64> = None;

        for (index, line) in text.split('\n').filter(|l| !l.is_empty()).enumerate() {
            let (key, value) = line
                .split_once(' ')
                .ok_or_else(|| Error::InvalidPointer(format!("malformed line {:?}", line)))?;

            if !valid_key(key) || value.is_empty() {
                return Err(Error::InvalidPointer(format!("malformed line {:?}", line)));
            }
            if !seen.insert(key) {
                return Err(Error::InvalidPointer(format!("duplicate key {:?}", key)));
            }

            match (index, key) {
                (0, "version") => {
                    if value != LFS_SPEC_V1 && value != HAWSER_SPEC_V1 {
                        return Err(Error::InvalidPointer(format!(
                            "unsupported version: {}",
                            value
                        )));
                    }
                }
                (0, _) => return Err(Error::InvalidPointer("missing version".into())),
                (_, "oid") => oid = Some(Oid::from_pointer_value(value)?),
                (_, "size") => size = Some(parse_size(value)?),
                _ => {}
            }
        }

        match (oid, size) {
            (Some(oid), Some(size)) => Ok(Pointer { oid, size }),
            (None, _) => Err(Error::InvalidPointer("missing oid".into())),
            (_, None) => Err(Error::InvalidPointer("missing size".into())),
        }
    }

    /// Cheap check that content starts like a pointer and is small enough
    /// to be classified as one.
    pub fn is_pointer(content: &[u8]) -> bool {
        (content.len() as u64) < LFS_POINTER_MAX_SIZE && content.starts_with(POINTER_SIGNATURE)
    }

    /// Get the OID of the referenced file.
    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    /// Get the size of the referenced file.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Encode the pointer to its canonical text representation.
    pub fn encode(&self) -> String {
        format!(
            "version {}\noid sha256:{}\nsize {}\n",
            LFS_SPEC_V1,
            self.oid.to_hex(),
            self.size
        )
    }

    /// Encode the pointer to bytes.
    pub fn encode_bytes(&self) -> Vec<u8> {
        self.encode().into_bytes()
    }
}

impl std::fmt::Display for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'-')
}

fn parse_size(value: &str) -> Result<u64> {
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidPointer(format!("invalid size {:?}", value)));
    }
    value
        .parse()
        .map_err(|_| Error::InvalidPointer(format!("invalid size {:?}", value)))
}

/// A blob found to be an LFS pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LfsPointer {
    /// Id of the pointer blob itself.
    pub oid: ObjectId,
    /// Size of the pointer blob.
    pub size: i64,
    /// The pointer text.
    pub data: Vec<u8>,
}

impl LfsPointer {
    /// Parse the pointer text to find the large file it references.
    pub fn pointer(&self) -> Result<Pointer> {
        Pointer::parse(&self.data)
    }
}

/// Decide whether a blob is an LFS pointer.
///
/// `size` is the blob's size from the object header and `data` its content,
/// read up to [`LFS_POINTER_MAX_SIZE`] bytes.
pub fn classify(id: &ObjectId, size: u64, data: &[u8]) -> Option<LfsPointer> {
    if data.len() as u64 != size || !Pointer::is_pointer(data) {
        return None;
    }
    Pointer::parse(data).ok()?;

    Some(LfsPointer {
        oid: id.clone(),
        size: size as i64,
        data: data.to_vec(),
    })
}

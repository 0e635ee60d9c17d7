//! LFS Object ID - SHA256 hash of the large file a pointer stands in for.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::{Error, Result};

/// Hash algorithm prefix used on the `oid` line of a pointer.
pub const OID_HASH_PREFIX: &str = "sha256:";

/// LFS Object ID - a SHA256 hash of the referenced file content.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid {
    bytes: [u8; 32],
}

impl Oid {
    /// Parse an OID from a lowercase hex string.
    ///
    /// Pointer files always spell the hash in lowercase, so uppercase digits
    /// are rejected rather than normalized.
    pub fn from_hex(hex: &str) -> Result<Self> {
        if hex.len() != 64 {
            return Err(Error::InvalidOid(format!(
                "expected 64 hex chars, got {}",
                hex.len()
            )));
        }
        if hex.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(Error::InvalidOid("uppercase hex digits".into()));
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex, &mut bytes).map_err(|e| Error::InvalidOid(e.to_string()))?;
        Ok(Oid { bytes })
    }

    /// Parse the value of a pointer's `oid` line (`sha256:<hex>`).
    pub fn from_pointer_value(value: &str) -> Result<Self> {
        let hex = value.strip_prefix(OID_HASH_PREFIX).ok_or_else(|| {
            Error::InvalidOid(format!("unsupported hash algorithm in {:?}", value))
        })?;
        Oid::from_hex(hex)
    }

    /// Hash the content a pointer will stand in for.
    pub fn from_content(content: &[u8]) -> Self {
        Oid {
            bytes: Sha256::digest(content).into(),
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", OID_HASH_PREFIX, self.to_hex())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Oid").field(&self.to_hex()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oid_from_content() {
        let oid = Oid::from_content(b"Hello, World!");
        assert_eq!(
            oid.to_hex(),
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
    }

    #[test]
    fn test_oid_from_pointer_value() {
        let value = "sha256:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393";
        let oid = Oid::from_pointer_value(value).unwrap();
        assert_eq!(oid.to_string(), value);

        assert!(Oid::from_pointer_value(
            "md5:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393"
        )
        .is_err());
    }

    #[test]
    fn test_oid_invalid_hex() {
        assert!(Oid::from_hex("not valid hex").is_err());
        assert!(Oid::from_hex("abc").is_err());
        // Right length, wrong alphabet
        assert!(Oid::from_hex(&"g".repeat(64)).is_err());
        assert!(Oid::from_hex(&"A".repeat(64)).is_err());
    }
}

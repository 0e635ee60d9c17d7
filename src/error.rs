//! Error types for git2-blobs operations.

use thiserror::Error;

/// Result type for git2-blobs operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving blobs.
#[derive(Error, Debug)]
pub enum Error {
    /// The request is missing a field or carries a malformed one
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A single-target lookup did not resolve
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid LFS pointer format
    #[error("invalid LFS pointer: {0}")]
    InvalidPointer(String),

    /// OID parsing error
    #[error("invalid OID: {0}")]
    InvalidOid(String),

    /// The object store returned inconsistent data
    #[error("corrupt object: {0}")]
    Corrupt(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Git operation error
    #[cfg(feature = "git2-integration")]
    #[error("Git error: {0}")]
    Git(String),
}

/// Status class an [`Error`] is reported as to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    InvalidArgument,
    NotFound,
    Internal,
}

impl Error {
    /// Map this error onto the caller-visible status class.
    pub fn code(&self) -> Code {
        match self {
            Error::InvalidArgument(_) | Error::InvalidOid(_) => Code::InvalidArgument,
            Error::NotFound(_) => Code::NotFound,
            Error::InvalidPointer(_) | Error::Corrupt(_) | Error::Io(_) | Error::Json(_) => {
                Code::Internal
            }
            #[cfg(feature = "git2-integration")]
            Error::Git(_) => Code::Internal,
        }
    }
}

#[cfg(feature = "git2-integration")]
impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Error::Git(err.message().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        assert_eq!(Error::InvalidArgument("x".into()).code(), Code::InvalidArgument);
        assert_eq!(Error::InvalidOid("x".into()).code(), Code::InvalidArgument);
        assert_eq!(Error::NotFound("x".into()).code(), Code::NotFound);
        assert_eq!(Error::Corrupt("x".into()).code(), Code::Internal);

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(Error::from(io).code(), Code::Internal);
    }
}

/// Object store error types
use std::io;
use thiserror::Error;

/// Result type alias using `StoreError`
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors reported by an object store provider.
///
/// Callers branch on the variant: `NotFound` and `Transient` have dedicated
/// handling in the sync engine, everything else is fatal for a run.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Object absent at the expected location
    #[error("object not found: {bucket}/{path}")]
    NotFound { bucket: String, path: String },

    /// Network or connectivity failure; the same request may succeed later
    #[error("transient transport error: {0}")]
    Transient(String),

    /// Any other failure reported by the remote store
    #[error("provider error: {0}")]
    Provider(String),

    /// Object path that cannot be addressed in this bucket
    #[error("invalid object path: {0}")]
    InvalidPath(String),

    /// No provider is registered for the bucket's scheme
    #[error("unsupported bucket scheme: {0}")]
    UnsupportedScheme(String),
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            path: path.into(),
        }
    }

    /// Create a transient transport error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// True if the object was absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True if the failure is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Classify an I/O error raised while serving `path` from `bucket`.
    ///
    /// Socket-level kinds are transient, a missing file is `NotFound`, and
    /// everything else is a provider failure.
    pub fn from_io(err: &io::Error, bucket: &str, path: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::not_found(bucket, path),
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::TimedOut
            | io::ErrorKind::Interrupted
            | io::ErrorKind::UnexpectedEof => {
                Self::transient(format!("{}/{}: {}", bucket, path, err))
            }
            _ => Self::provider(format!("{}/{}: {}", bucket, path, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_classification() {
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert!(StoreError::from_io(&missing, "fs://b", "a.txt").is_not_found());

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(StoreError::from_io(&reset, "fs://b", "a.txt").is_transient());

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = StoreError::from_io(&denied, "fs://b", "a.txt");
        assert!(!err.is_transient());
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("fs://b/a.txt"));
    }
}

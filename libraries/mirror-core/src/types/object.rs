/// Object listing types
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque content digest supplied by a provider (an entity tag, a content hash).
///
/// Only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a provider-supplied digest
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// Hex SHA-256 of `content`, used by the bundled providers
    pub fn of_bytes(content: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(content)))
    }

    /// Finish an incremental SHA-256 computation
    pub fn from_hasher(hasher: Sha256) -> Self {
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One object as reported by a bucket listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub path: String,
    pub fingerprint: Fingerprint,
}

impl ObjectInfo {
    pub fn new(path: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            path: path.into(),
            fingerprint,
        }
    }
}

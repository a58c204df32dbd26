//! Bucket Mirror Core
//!
//! Provider-agnostic types, the object store abstraction, and error handling
//! shared by the ledger and the synchronization engine.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `BucketUri`, `ObjectInfo`, `Fingerprint`, ledger entries
//! - **Core Traits**: `ObjectStore`, implemented once per provider
//! - **Error Handling**: `StoreError`, which keeps "not found" and transient
//!   transport failures distinguishable from every other provider failure
//! - **Providers**: an in-memory bucket and a local directory bucket (`fs://`)
//!
//! # Example
//!
//! ```rust
//! use mirror_core::{BucketUri, StoreRegistry};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let uri: BucketUri = "fs:///srv/backups".parse()?;
//! assert_eq!(uri.scheme(), "fs");
//!
//! let registry = StoreRegistry::with_defaults();
//! let store = registry.open(&uri)?;
//! assert_eq!(store.bucket(), &uri);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod registry;
pub mod stores;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Result, StoreError};
pub use registry::StoreRegistry;
pub use stores::{Fault, LocalStore, MemoryStore, Operation};
pub use traits::{ByteReader, ByteStream, ListStream, ObjectStore};
pub use types::{
    BucketUri, DestinationEntry, Fingerprint, ObjectInfo, ParseBucketError, Relation, SourceEntry,
};

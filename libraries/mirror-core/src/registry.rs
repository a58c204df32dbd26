//! Provider selection by bucket scheme
//!
//! A `StoreRegistry` maps a scheme (`fs`, `s3`, `gs`...) to a constructor.
//! The engine resolves each bucket exactly once, up front, and passes the
//! resulting client to every phase.

use crate::error::{Result, StoreError};
use crate::stores::LocalStore;
use crate::traits::ObjectStore;
use crate::types::BucketUri;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type StoreFactory = Box<dyn Fn(&BucketUri) -> Result<Arc<dyn ObjectStore>> + Send + Sync>;

/// Scheme -> provider constructor table
#[derive(Default)]
pub struct StoreRegistry {
    factories: HashMap<String, StoreFactory>,
}

impl StoreRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled providers (`fs`)
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("fs", |uri| Ok(Arc::new(LocalStore::new(uri.clone())) as Arc<dyn ObjectStore>));
        registry
    }

    /// Register (or replace) the constructor for `scheme`
    pub fn register<F>(&mut self, scheme: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&BucketUri) -> Result<Arc<dyn ObjectStore>> + Send + Sync + 'static,
    {
        self.factories.insert(scheme.into(), Box::new(factory));
        self
    }

    /// Schemes this registry can open, sorted
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Build the client for `uri`
    pub fn open(&self, uri: &BucketUri) -> Result<Arc<dyn ObjectStore>> {
        let factory = self
            .factories
            .get(uri.scheme())
            .ok_or_else(|| StoreError::UnsupportedScheme(uri.scheme().to_string()))?;
        factory(uri)
    }
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;

    #[test]
    fn test_defaults_open_local_buckets() {
        let registry = StoreRegistry::with_defaults();
        let uri: BucketUri = "fs:///tmp/mirror".parse().unwrap();

        let store = registry.open(&uri).unwrap();
        assert_eq!(store.bucket(), &uri);
        assert_eq!(registry.schemes(), vec!["fs"]);
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        let registry = StoreRegistry::with_defaults();
        let uri: BucketUri = "gs://photos".parse().unwrap();

        let err = registry.open(&uri).err().unwrap();
        assert!(matches!(err, StoreError::UnsupportedScheme(ref s) if s == "gs"));
    }

    #[test]
    fn test_custom_factory_is_used() {
        let shared = Arc::new(MemoryStore::new("mem://shared".parse().unwrap()));
        let mut registry = StoreRegistry::new();
        let handle = Arc::clone(&shared);
        registry.register("mem", move |_| Ok(handle.clone() as Arc<dyn ObjectStore>));

        let store = registry.open(&"mem://anything".parse().unwrap()).unwrap();
        assert_eq!(store.bucket().to_string(), "mem://shared");
    }
}

//! In-memory bucket
//!
//! Holds objects in a map and records every call it serves. Faults can be
//! scripted per operation and path so callers can exercise retry and
//! not-found handling without a network.

use crate::error::{Result, StoreError};
use crate::traits::{ByteReader, ByteStream, ListStream, ObjectStore};
use crate::types::{BucketUri, Fingerprint, ObjectInfo};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use tokio::io::AsyncReadExt;

/// Object store operation, used to address call counters and faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Put,
    Delete,
}

/// Failure a `MemoryStore` can be told to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Connection dropped; the caller should retry
    Transient,
    /// Object reported missing even if it exists
    NotFound,
    /// Any other provider failure
    Provider,
}

#[derive(Debug, Clone)]
struct StoredObject {
    content: Bytes,
    fingerprint: Fingerprint,
}

impl StoredObject {
    fn new(content: Bytes) -> Self {
        let fingerprint = Fingerprint::of_bytes(&content);
        Self {
            content,
            fingerprint,
        }
    }
}

type CallKey = (Operation, String);

/// Thread-safe in-memory bucket
pub struct MemoryStore {
    bucket: BucketUri,
    objects: RwLock<BTreeMap<String, StoredObject>>,
    faults: Mutex<HashMap<CallKey, VecDeque<Fault>>>,
    calls: Mutex<HashMap<CallKey, usize>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    /// Create an empty bucket
    pub fn new(bucket: BucketUri) -> Self {
        Self {
            bucket,
            objects: RwLock::new(BTreeMap::new()),
            faults: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Create a bucket pre-populated with `(path, content)` pairs
    pub fn with_objects<I, P, C>(bucket: BucketUri, objects: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<Bytes>,
    {
        let store = Self::new(bucket);
        for (path, content) in objects {
            store.insert(path, content);
        }
        store
    }

    /// Create or overwrite an object without counting a call
    pub fn insert(&self, path: impl Into<String>, content: impl Into<Bytes>) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), StoredObject::new(content.into()));
    }

    /// Remove an object without counting a call
    pub fn remove(&self, path: &str) -> Option<Bytes> {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .map(|object| object.content)
    }

    /// Current content of an object
    pub fn content(&self, path: &str) -> Option<Bytes> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .map(|object| object.content.clone())
    }

    /// Path -> fingerprint view of the whole bucket
    pub fn fingerprints(&self) -> BTreeMap<String, Fingerprint> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(path, object)| (path.clone(), object.fingerprint.clone()))
            .collect()
    }

    /// All object paths, sorted
    pub fn paths(&self) -> Vec<String> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Make the next `times` calls of `operation` on `path` fail with `fault`
    pub fn inject(&self, operation: Operation, path: impl Into<String>, fault: Fault, times: usize) {
        lock(&self.faults)
            .entry((operation, path.into()))
            .or_default()
            .extend(std::iter::repeat(fault).take(times));
    }

    /// Number of `operation` calls served for `path`, including failed ones
    pub fn calls(&self, operation: Operation, path: &str) -> usize {
        lock(&self.calls)
            .get(&(operation, path.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Number of `operation` calls served across all paths
    pub fn total_calls(&self, operation: Operation) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|((op, _), _)| *op == operation)
            .map(|(_, count)| count)
            .sum()
    }

    /// Forget all recorded calls
    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Record a call and return the scripted fault for it, if any
    fn enter(&self, operation: Operation, path: &str) -> Result<()> {
        let key = (operation, path.to_string());
        *lock(&self.calls).entry(key.clone()).or_insert(0) += 1;

        let fault = lock(&self.faults)
            .get_mut(&key)
            .and_then(|queue| queue.pop_front());

        match fault {
            None => Ok(()),
            Some(Fault::Transient) => Err(StoreError::transient(format!(
                "connection reset during {:?} of {}/{}",
                operation, self.bucket, path
            ))),
            Some(Fault::NotFound) => Err(StoreError::not_found(self.bucket.to_string(), path)),
            Some(Fault::Provider) => Err(StoreError::provider(format!(
                "{:?} of {}/{} rejected by provider",
                operation, self.bucket, path
            ))),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &BucketUri {
        &self.bucket
    }

    fn list(&self) -> ListStream<'_> {
        let listing: Vec<Result<ObjectInfo>> = self
            .fingerprints()
            .into_iter()
            .map(|(path, fingerprint)| Ok(ObjectInfo::new(path, fingerprint)))
            .collect();
        stream::iter(listing).boxed()
    }

    async fn get(&self, path: &str) -> Result<ByteStream> {
        self.enter(Operation::Get, path)?;

        let content = self
            .content(path)
            .ok_or_else(|| StoreError::not_found(self.bucket.to_string(), path))?;
        Ok(stream::once(async move { Ok::<_, StoreError>(content) }).boxed())
    }

    async fn put(&self, path: &str, mut body: ByteReader, length: u64) -> Result<()> {
        self.enter(Operation::Put, path)?;

        let mut buffer = Vec::with_capacity(length as usize);
        body.read_to_end(&mut buffer)
            .await
            .map_err(|e| StoreError::from_io(&e, &self.bucket.to_string(), path))?;

        if buffer.len() as u64 != length {
            return Err(StoreError::provider(format!(
                "short upload for {}/{}: expected {} bytes, got {}",
                self.bucket,
                path,
                length,
                buffer.len()
            )));
        }

        self.insert(path, buffer);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.enter(Operation::Delete, path)?;

        self.remove(path)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(self.bucket.to_string(), path))
    }
}

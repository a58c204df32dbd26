//! Local directory bucket (`fs://<directory>`)
//!
//! Every regular file below the root directory is an object whose path is
//! the `/`-separated path relative to the root. Fingerprints are SHA-256
//! content digests, so two directories holding the same bytes compare equal.
//!
//! Uploads are staged in a uniquely named sibling file and renamed into
//! place. Staging files left behind by a crash are ordinary entries in the
//! next listing, so a mirror run removes them as orphans.

use crate::error::{Result, StoreError};
use crate::traits::{ByteReader, ByteStream, ListStream, ObjectStore};
use crate::types::{BucketUri, Fingerprint, ObjectInfo};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// Suffix of in-flight upload files
const STAGING_SUFFIX: &str = ".mirror-tmp";

/// Listing entries buffered between the walker thread and the consumer
const LIST_CHANNEL_CAPACITY: usize = 256;

/// Directory tree exposed as a bucket
#[derive(Debug, Clone)]
pub struct LocalStore {
    bucket: BucketUri,
    root: PathBuf,
}

impl LocalStore {
    /// Serve the directory named by `bucket` (e.g. `fs:///srv/data`)
    pub fn new(bucket: BucketUri) -> Self {
        let root = PathBuf::from(bucket.name());
        Self { bucket, root }
    }

    /// Root directory of the bucket
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an object path onto the filesystem, refusing anything that could
    /// escape the root directory
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if path.is_empty() {
            return Err(StoreError::InvalidPath(path.to_string()));
        }

        let mut resolved = self.root.clone();
        for part in path.split('/') {
            if part.is_empty() || part == "." || part == ".." || part.contains('\\') {
                return Err(StoreError::InvalidPath(path.to_string()));
            }
            resolved.push(part);
        }
        Ok(resolved)
    }

    fn io_error(&self, err: &io::Error, path: &str) -> StoreError {
        StoreError::from_io(err, &self.bucket.to_string(), path)
    }

    /// Classify a failed lookup of `target`. A regular file sitting where one
    /// of its directories should be means the object does not exist.
    async fn lookup_error(&self, err: &io::Error, target: &Path, path: &str) -> StoreError {
        if err.kind() == io::ErrorKind::NotFound || self.file_ancestor(target).await.is_some() {
            return StoreError::not_found(self.bucket.to_string(), path);
        }
        self.io_error(err, path)
    }

    /// First entry between `target` and the root that exists but is not a
    /// directory
    async fn file_ancestor(&self, target: &Path) -> Option<PathBuf> {
        for ancestor in target.ancestors().skip(1) {
            if ancestor == self.root || !ancestor.starts_with(&self.root) {
                break;
            }
            if let Ok(metadata) = fs::symlink_metadata(ancestor).await {
                if !metadata.is_dir() {
                    return Some(ancestor.to_path_buf());
                }
            }
        }
        None
    }

    /// Make room for an upload to `target`: a file where a directory is
    /// needed is removed, as is a directory where the object itself goes.
    /// Everything below the root belongs to the mirror, and whatever was
    /// removed is an orphan the reconciler will find already gone.
    async fn clear_way(&self, target: &Path, path: &str) -> Result<()> {
        if let Some(blocker) = self.file_ancestor(target).await {
            debug!(path = %path, blocker = %blocker.display(), "Removing file in place of a directory");
            fs::remove_file(&blocker)
                .await
                .map_err(|e| self.io_error(&e, path))?;
        }

        if let Ok(metadata) = fs::symlink_metadata(target).await {
            if metadata.is_dir() {
                debug!(path = %path, "Removing directory in place of an object");
                fs::remove_dir_all(target)
                    .await
                    .map_err(|e| self.io_error(&e, path))?;
            }
        }
        Ok(())
    }

    /// Remove directories left empty by a delete, stopping at the root
    async fn prune_empty_parents(&self, file: &Path) {
        let mut dir = file.parent();
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            if fs::remove_dir(current).await.is_err() {
                break;
            }
            dir = current.parent();
        }
    }
}

fn hash_file(path: &Path) -> std::io::Result<Fingerprint> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(Fingerprint::from_hasher(hasher))
}

/// Walk `root` on a blocking thread, sending one entry per regular file
fn walk(root: &Path, bucket: &str, tx: &mpsc::Sender<Result<ObjectInfo>>) {
    if !root.is_dir() {
        let _ = tx.blocking_send(Err(StoreError::provider(format!(
            "bucket directory does not exist: {}",
            root.display()
        ))));
        return;
    }

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let _ = tx.blocking_send(Err(StoreError::provider(format!(
                    "failed to walk {}: {}",
                    bucket, e
                ))));
                return;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = match entry.path().strip_prefix(root) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let parts: Option<Vec<&str>> = relative.iter().map(|part| part.to_str()).collect();
        let Some(parts) = parts else {
            let _ = tx.blocking_send(Err(StoreError::InvalidPath(
                relative.to_string_lossy().into_owned(),
            )));
            return;
        };
        let object_path = parts.join("/");

        let item = match hash_file(entry.path()) {
            Ok(fingerprint) => Ok(ObjectInfo::new(object_path, fingerprint)),
            // Removed while we were walking; it is simply not part of the listing
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %object_path, "File vanished during listing");
                continue;
            }
            Err(e) => Err(StoreError::from_io(&e, bucket, &object_path)),
        };

        let failed = item.is_err();
        if tx.blocking_send(item).is_err() || failed {
            return;
        }
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn bucket(&self) -> &BucketUri {
        &self.bucket
    }

    fn list(&self) -> ListStream<'_> {
        let (tx, rx) = mpsc::channel(LIST_CHANNEL_CAPACITY);
        let root = self.root.clone();
        let bucket = self.bucket.to_string();

        tokio::task::spawn_blocking(move || walk(&root, &bucket, &tx));

        stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed()
    }

    async fn get(&self, path: &str) -> Result<ByteStream> {
        let target = self.resolve(path)?;

        let metadata = match fs::metadata(&target).await {
            Ok(metadata) => metadata,
            Err(e) => return Err(self.lookup_error(&e, &target, path).await),
        };
        if !metadata.is_file() {
            return Err(StoreError::not_found(self.bucket.to_string(), path));
        }

        let file = fs::File::open(&target)
            .await
            .map_err(|e| self.io_error(&e, path))?;

        let bucket = self.bucket.to_string();
        let object_path = path.to_string();
        Ok(ReaderStream::new(file)
            .map(move |chunk| chunk.map_err(|e| StoreError::from_io(&e, &bucket, &object_path)))
            .boxed())
    }

    async fn put(&self, path: &str, mut body: ByteReader, length: u64) -> Result<()> {
        let target = self.resolve(path)?;
        let parent = target
            .parent()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        let file_name = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        let temp = parent.join(format!(".{}.{}{}", file_name, Uuid::new_v4().simple(), STAGING_SUFFIX));

        self.clear_way(&target, path).await?;
        fs::create_dir_all(parent)
            .await
            .map_err(|e| self.io_error(&e, path))?;

        let written = async {
            let mut file = OpenOptions::new().write(true).create_new(true).open(&temp).await?;
            let written = tokio::io::copy(&mut body, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok::<_, io::Error>(written)
        }
        .await;

        let written = match written {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&temp).await;
                return Err(self.io_error(&e, path));
            }
        };

        if written != length {
            let _ = fs::remove_file(&temp).await;
            return Err(StoreError::provider(format!(
                "short upload for {}/{}: expected {} bytes, got {}",
                self.bucket, path, length, written
            )));
        }

        fs::rename(&temp, &target).await.map_err(|e| {
            warn!(path = %path, error = %e, "Failed to move upload into place");
            self.io_error(&e, path)
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;

        match fs::symlink_metadata(&target).await {
            Ok(metadata) if metadata.is_dir() => {
                return Err(StoreError::not_found(self.bucket.to_string(), path));
            }
            Ok(_) => {}
            Err(e) => return Err(self.lookup_error(&e, &target, path).await),
        }

        if let Err(e) = fs::remove_file(&target).await {
            return Err(self.lookup_error(&e, &target, path).await);
        }

        self.prune_empty_parents(&target).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures_util::TryStreamExt;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> LocalStore {
        let uri = BucketUri::new("fs", dir.path().to_string_lossy().into_owned()).unwrap();
        LocalStore::new(uri)
    }

    fn reader(content: &[u8]) -> ByteReader {
        Box::new(std::io::Cursor::new(content.to_vec()))
    }

    #[tokio::test]
    async fn test_put_then_list_and_get() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.put("photos/2024/a.jpg", reader(b"jpeg"), 4).await.unwrap();
        store.put("b.txt", reader(b"text"), 4).await.unwrap();

        let listing: Vec<ObjectInfo> = store.list().try_collect().await.unwrap();
        let paths: Vec<&str> = listing.iter().map(|o| o.path.as_str()).collect();
        assert_eq!(paths, vec!["b.txt", "photos/2024/a.jpg"]);
        assert_eq!(listing[1].fingerprint, Fingerprint::of_bytes(b"jpeg"));

        let chunks: Vec<Bytes> = store.get("photos/2024/a.jpg").await.unwrap().try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"jpeg");
    }

    #[tokio::test]
    async fn test_missing_objects_are_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.get("nope.txt").await.err().unwrap().is_not_found());
        assert!(store.delete("nope.txt").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_rejects_paths_escaping_root() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for path in ["../outside", "/etc/passwd", "a//b", "a/./b", ""] {
            let err = store.put(path, reader(b"x"), 1).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidPath(_)), "path {:?}", path);
        }
    }

    #[tokio::test]
    async fn test_delete_prunes_empty_directories() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.put("deep/nested/file", reader(b"x"), 1).await.unwrap();
        store.put("deep/keep", reader(b"y"), 1).await.unwrap();
        store.delete("deep/nested/file").await.unwrap();

        assert!(!dir.path().join("deep/nested").exists());
        assert!(dir.path().join("deep/keep").exists());
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn test_names_like_staging_files_are_ordinary_objects() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".b.mirror-tmp"), b"real").unwrap();
        let store = store_in(&dir);

        store.put("b", reader(b"other"), 5).await.unwrap();

        let listing: Vec<ObjectInfo> = store.list().try_collect().await.unwrap();
        let paths: Vec<&str> = listing.iter().map(|o| o.path.as_str()).collect();
        assert_eq!(paths, vec![".b.mirror-tmp", "b"]);
        assert_eq!(std::fs::read(dir.path().join(".b.mirror-tmp")).unwrap(), b"real");
        assert_eq!(std::fs::read(dir.path().join("b")).unwrap(), b"other");
    }

    #[tokio::test]
    async fn test_put_replaces_file_blocking_a_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a"), b"old file").unwrap();
        let store = store_in(&dir);

        store.put("a/b", reader(b"new"), 3).await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("a/b")).unwrap(), b"new");
        assert!(store.delete("a").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_put_replaces_directory_in_place_of_object() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("a/deeper")).unwrap();
        std::fs::write(dir.path().join("a/deeper/b"), b"old").unwrap();
        let store = store_in(&dir);

        store.put("a", reader(b"file"), 4).await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("a")).unwrap(), b"file");
        assert!(store.delete("a/deeper/b").await.unwrap_err().is_not_found());
        assert!(store.get("a/deeper/b").await.err().unwrap().is_not_found());
    }

    #[tokio::test]
    async fn test_listing_missing_root_fails() {
        let dir = TempDir::new().unwrap();
        let uri = BucketUri::new("fs", dir.path().join("absent").to_string_lossy().into_owned()).unwrap();
        let store = LocalStore::new(uri);

        let result: Result<Vec<ObjectInfo>> = store.list().try_collect().await;
        assert!(matches!(result, Err(StoreError::Provider(_))));
    }
}

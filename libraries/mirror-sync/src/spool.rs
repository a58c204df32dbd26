//! Object content buffer that spills to disk
//!
//! A download is held in memory until it grows past the threshold, then
//! moved to an anonymous temporary file that disappears when dropped.

use mirror_core::ByteReader;
use std::io::{self, Cursor, SeekFrom};
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

/// Default in-memory limit before spilling (10 MiB)
pub const DEFAULT_SPOOL_THRESHOLD: usize = 10 * 1024 * 1024;

#[derive(Debug)]
pub struct SpoolBuffer {
    threshold: usize,
    memory: Vec<u8>,
    file: Option<File>,
    len: u64,
}

impl SpoolBuffer {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            memory: Vec::new(),
            file: None,
            len: 0,
        }
    }

    /// Bytes written so far
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once the content has moved to a temporary file
    pub fn is_spilled(&self) -> bool {
        self.file.is_some()
    }

    pub async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        if self.file.is_none() && self.memory.len() + chunk.len() > self.threshold {
            self.spill().await?;
        }

        match &mut self.file {
            Some(file) => file.write_all(chunk).await?,
            None => self.memory.extend_from_slice(chunk),
        }
        self.len += chunk.len() as u64;
        Ok(())
    }

    async fn spill(&mut self) -> io::Result<()> {
        let std_file = tokio::task::spawn_blocking(tempfile::tempfile)
            .await
            .map_err(io::Error::other)??;
        let mut file = File::from_std(std_file);

        file.write_all(&self.memory).await?;
        debug!(bytes = self.memory.len(), "Spooling object to temporary file");

        self.memory = Vec::new();
        self.file = Some(file);
        Ok(())
    }

    /// Reader over everything written, from the first byte
    pub async fn into_reader(self) -> io::Result<ByteReader> {
        match self.file {
            Some(mut file) => {
                file.flush().await?;
                file.seek(SeekFrom::Start(0)).await?;
                Ok(Box::new(file))
            }
            None => Ok(Box::new(Cursor::new(self.memory))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn read_back(buffer: SpoolBuffer) -> Vec<u8> {
        let mut reader = buffer.into_reader().await.unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_small_content_stays_in_memory() {
        let mut buffer = SpoolBuffer::new(16);
        buffer.write(b"hello ").await.unwrap();
        buffer.write(b"world").await.unwrap();

        assert!(!buffer.is_spilled());
        assert_eq!(buffer.len(), 11);
        assert_eq!(read_back(buffer).await, b"hello world");
    }

    #[tokio::test]
    async fn test_large_content_spills_to_disk() {
        let chunk: Vec<u8> = (0..=255u8).collect();
        let mut buffer = SpoolBuffer::new(1000);
        for _ in 0..10 {
            buffer.write(&chunk).await.unwrap();
        }

        assert!(buffer.is_spilled());
        assert_eq!(buffer.len(), 2560);

        let content = read_back(buffer).await;
        assert_eq!(content.len(), 2560);
        assert_eq!(content, chunk.repeat(10));
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let mut buffer = SpoolBuffer::new(4);
        buffer.write(b"abcd").await.unwrap();
        assert!(!buffer.is_spilled());

        buffer.write(b"e").await.unwrap();
        assert!(buffer.is_spilled());
        assert_eq!(read_back(buffer).await, b"abcde");
    }

    #[tokio::test]
    async fn test_empty_buffer() {
        let buffer = SpoolBuffer::new(4);
        assert!(buffer.is_empty());
        assert!(read_back(buffer).await.is_empty());
    }
}

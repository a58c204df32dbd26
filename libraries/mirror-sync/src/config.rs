use crate::error::{Result, SyncError};
use crate::retry::RetryPolicy;
use crate::spool::DEFAULT_SPOOL_THRESHOLD;
use mirror_core::BucketUri;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Default number of source paths fetched from the ledger per batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Worker count used when the host parallelism cannot be determined
const FALLBACK_WORKERS: usize = 4;

/// Everything one run needs to know, passed explicitly to each phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub source: BucketUri,
    pub destination: BucketUri,
    pub ledger_path: PathBuf,
    pub workers: usize,
    pub batch_size: usize,
    pub spool_threshold: usize,
    pub retry: RetryPolicy,
}

/// Host parallelism, the default worker count
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(FALLBACK_WORKERS, NonZeroUsize::get)
}

impl RunConfig {
    pub fn new(source: BucketUri, destination: BucketUri, ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            destination,
            ledger_path: ledger_path.into(),
            workers: default_workers(),
            batch_size: DEFAULT_BATCH_SIZE,
            spool_threshold: DEFAULT_SPOOL_THRESHOLD,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_spool_threshold(mut self, bytes: usize) -> Self {
        self.spool_threshold = bytes;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.source == self.destination {
            return Err(SyncError::invalid_config(format!(
                "source and destination are the same bucket: {}",
                self.source
            )));
        }

        if self.workers == 0 {
            return Err(SyncError::invalid_config("workers must be at least 1"));
        }

        if self.batch_size == 0 {
            return Err(SyncError::invalid_config("batch size must be at least 1"));
        }

        if self.retry.max_attempts == 0 {
            return Err(SyncError::invalid_config("max attempts must be at least 1"));
        }

        if self.retry.initial_backoff > self.retry.max_backoff {
            return Err(SyncError::invalid_config(
                "initial backoff must not exceed max backoff",
            ));
        }

        if self.ledger_path.as_os_str().is_empty() {
            return Err(SyncError::invalid_config("ledger path is empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfig {
        RunConfig::new(
            "mem://source".parse().unwrap(),
            "mem://destination".parse().unwrap(),
            "state.db",
        )
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.spool_threshold, 10 * 1024 * 1024);
        assert_eq!(config.retry.max_attempts, 5);
        assert!(config.workers >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_degenerate_settings() {
        assert!(config().with_workers(0).validate().is_err());
        assert!(config().with_batch_size(0).validate().is_err());

        let mut no_attempts = config();
        no_attempts.retry.max_attempts = 0;
        assert!(no_attempts.validate().is_err());
    }

    #[test]
    fn test_rejects_identical_buckets() {
        let mut config = config();
        config.destination = config.source.clone();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));
    }
}

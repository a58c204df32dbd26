/// Mirror configuration
use crate::error::{CliError, Result};
use mirror_core::BucketUri;
use mirror_sync::{RetryPolicy, RunConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix, e.g. `MIRROR_TRANSFER__WORKERS=16`
pub const ENV_PREFIX: &str = "MIRROR";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MirrorConfig {
    #[serde(default = "default_ledger")]
    pub ledger: LedgerSettings,

    #[serde(default = "default_transfer")]
    pub transfer: TransferSettings,

    #[serde(default = "default_retry")]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LedgerSettings {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransferSettings {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_spool_threshold_bytes")]
    pub spool_threshold_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

/// Values given on the command line; they win over file and environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub ledger: Option<PathBuf>,
    pub workers: Option<usize>,
    pub batch_size: Option<usize>,
    pub max_attempts: Option<u32>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            ledger: default_ledger(),
            transfer: default_transfer(),
            retry: default_retry(),
        }
    }
}

impl MirrorConfig {
    /// Load configuration from an optional TOML file and the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = file {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            settings = settings.add_source(config::File::from(path.to_path_buf()));
        }

        // Override with environment variables (prefixed with MIRROR_)
        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(path) = overrides.ledger {
            self.ledger.path = path;
        }
        if let Some(workers) = overrides.workers {
            self.transfer.workers = workers;
        }
        if let Some(batch_size) = overrides.batch_size {
            self.transfer.batch_size = batch_size;
        }
        if let Some(max_attempts) = overrides.max_attempts {
            self.retry.max_attempts = max_attempts;
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.transfer.workers == 0 {
            return Err(CliError::Config("transfer.workers must be at least 1".to_string()));
        }

        if self.transfer.batch_size == 0 {
            return Err(CliError::Config(
                "transfer.batch_size must be at least 1".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(CliError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(CliError::Config(format!(
                "retry.initial_backoff_ms ({}) exceeds retry.max_backoff_ms ({})",
                self.retry.initial_backoff_ms, self.retry.max_backoff_ms
            )));
        }

        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.initial_backoff_ms),
            Duration::from_millis(self.retry.max_backoff_ms),
        )
    }

    /// Engine settings for mirroring `source` onto `destination`
    pub fn run_config(&self, source: BucketUri, destination: BucketUri) -> RunConfig {
        RunConfig::new(source, destination, self.ledger.path.clone())
            .with_workers(self.transfer.workers)
            .with_batch_size(self.transfer.batch_size)
            .with_spool_threshold(self.transfer.spool_threshold_bytes)
            .with_retry(self.retry_policy())
    }
}

// Default values
fn default_ledger() -> LedgerSettings {
    LedgerSettings {
        path: default_ledger_path(),
    }
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from(mirror_storage::DEFAULT_LEDGER_PATH)
}

fn default_transfer() -> TransferSettings {
    TransferSettings {
        workers: default_workers(),
        batch_size: default_batch_size(),
        spool_threshold_bytes: default_spool_threshold_bytes(),
    }
}

fn default_workers() -> usize {
    mirror_sync::default_workers()
}

fn default_batch_size() -> usize {
    mirror_sync::DEFAULT_BATCH_SIZE
}

fn default_spool_threshold_bytes() -> usize {
    mirror_sync::DEFAULT_SPOOL_THRESHOLD
}

fn default_retry() -> RetrySettings {
    let policy = RetryPolicy::default();
    RetrySettings {
        max_attempts: policy.max_attempts,
        initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
        max_backoff_ms: policy.max_backoff.as_millis() as u64,
    }
}

fn default_max_attempts() -> u32 {
    default_retry().max_attempts
}

fn default_initial_backoff_ms() -> u64 {
    default_retry().initial_backoff_ms
}

fn default_max_backoff_ms() -> u64 {
    default_retry().max_backoff_ms
}

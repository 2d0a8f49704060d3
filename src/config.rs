//! Runtime configuration for the vanity keypair generator.

use std::time::Duration;

use clap::Parser;

/// Solana Vanity Keypair Generator
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Prefix to search for (Base58 characters only)
    #[arg(short, long)]
    pub pattern: String,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Case sensitive matching
    #[arg(short = 'c', long, default_value = "false")]
    pub case_sensitive: bool,

    /// Give up after this many keypairs across all workers
    #[arg(short = 'm', long)]
    pub max_attempts: Option<u64>,

    /// Give up after this many seconds
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Progress report interval in seconds
    #[arg(short = 'r', long, default_value = "5")]
    pub report_interval: u64,

    /// Print the result as JSON
    #[arg(long, default_value = "false")]
    pub json: bool,

    /// Enable debug logging
    #[arg(short = 'v', long, default_value = "false")]
    pub verbose: bool,
}

impl Config {
    /// Returns the number of workers, defaulting to CPU count
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    /// Builds the search configuration.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            worker_count: self.worker_count(),
            max_attempts: self.max_attempts,
            max_duration: self.timeout.map(Duration::from_secs),
            case_sensitive: self.case_sensitive,
            progress_interval: Duration::from_secs(self.report_interval),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.report_interval == 0 {
            return Err(ConfigError::ZeroReportInterval);
        }
        self.search_config().validate()
    }
}

/// Parameters of a single search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Number of concurrent workers
    pub worker_count: usize,
    /// Bound on keypairs generated across all workers (`None` = unbounded)
    pub max_attempts: Option<u64>,
    /// Bound on wall-clock time (`None` = unbounded)
    pub max_duration: Option<Duration>,
    /// Whether the pattern is matched case sensitively
    pub case_sensitive: bool,
    /// How often progress snapshots are taken
    pub progress_interval: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            max_attempts: None,
            max_duration: None,
            case_sensitive: false,
            progress_interval: Duration::from_secs(1),
        }
    }
}

impl SearchConfig {
    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.max_attempts == Some(0) {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        if self.max_duration == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroMaxDuration);
        }
        Ok(())
    }

    /// Number of workers actually spawned: never more than the attempt bound.
    pub fn effective_workers(&self) -> usize {
        match self.max_attempts {
            Some(max) => self.worker_count.min(usize::try_from(max).unwrap_or(usize::MAX)),
            None => self.worker_count,
        }
    }

    /// Per-worker share of `max_attempts`; the shares sum to the bound.
    pub fn worker_quota(&self, worker_id: usize) -> Option<u64> {
        let max = self.max_attempts?;
        let workers = self.effective_workers().max(1) as u64;
        let extra = u64::from((worker_id as u64) < max % workers);
        Some(max / workers + extra)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    ZeroWorkers,

    #[error("max attempts must be at least 1")]
    ZeroMaxAttempts,

    #[error("max duration must be positive")]
    ZeroMaxDuration,

    #[error("report interval must be at least 1 second")]
    ZeroReportInterval,
}

use std::time::Duration;

use crate::error::AppError;
use crate::models::DEFAULT_CATEGORY;

/// Fixed crawl policy shared by every job a process runs.
///
/// Operators may tune it through the environment; callers triggering a job
/// cannot.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Total requests a single run may dispatch (retries excluded).
    pub max_requests: usize,
    /// Deadline for loading and processing one request.
    pub request_timeout: Duration,
    /// Requests processed in parallel.
    pub concurrency: usize,
    /// Extra attempts for a request that failed with a transient error.
    pub max_retries: u32,
    /// Minimum delay between two requests to the same host.
    pub throttle: Duration,
    /// Category stamped on every record.
    pub category: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            request_timeout: Duration::from_secs(60),
            concurrency: 5,
            max_retries: 3,
            throttle: Duration::ZERO,
            category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

impl CrawlConfig {
    /// Read configuration from environment variables.
    ///
    /// - `FOLIO_MAX_REQUESTS` (default 30)
    /// - `FOLIO_REQUEST_TIMEOUT_SECS` (default 60)
    /// - `FOLIO_CONCURRENCY` (default 5)
    /// - `FOLIO_MAX_RETRIES` (default 3)
    /// - `FOLIO_THROTTLE_MS` (default 0, disabled)
    /// - `FOLIO_DEFAULT_CATEGORY` (default "Books")
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();

        let max_requests = positive(&lookup, "FOLIO_MAX_REQUESTS")?.unwrap_or(defaults.max_requests);
        let request_timeout = positive(&lookup, "FOLIO_REQUEST_TIMEOUT_SECS")?
            .map(|secs| Duration::from_secs(secs as u64))
            .unwrap_or(defaults.request_timeout);
        let concurrency = positive(&lookup, "FOLIO_CONCURRENCY")?.unwrap_or(defaults.concurrency);
        let max_retries = parse::<u32>(&lookup, "FOLIO_MAX_RETRIES")?.unwrap_or(defaults.max_retries);
        let throttle = parse::<u64>(&lookup, "FOLIO_THROTTLE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.throttle);
        let category = lookup("FOLIO_DEFAULT_CATEGORY")
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or(defaults.category);

        Ok(Self {
            max_requests,
            request_timeout,
            concurrency,
            max_retries,
            throttle,
            category,
        })
    }

    pub fn with_max_requests(mut self, max: usize) -> Self {
        self.max_requests = max;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_throttle(mut self, delay: Duration) -> Self {
        self.throttle = delay;
        self
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, AppError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            AppError::ConfigError(format!("Invalid {key} '{raw}': must be a non-negative integer"))
        }),
    }
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<usize>, AppError> {
    match parse::<usize>(lookup, key)? {
        Some(0) => Err(AppError::ConfigError(format!("{key} must be at least 1"))),
        other => Ok(other),
    }
}

//! Client and run configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::{CorpusError, Result};
use crate::rate_limit::{NCBI_RATE_WITH_KEY, NCBI_RATE_WITHOUT_KEY, RateLimiter};
use crate::retry::RetryConfig;

/// NCBI E-utilities endpoint
pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Default tool name reported to NCBI
pub const DEFAULT_TOOL: &str = "ncbi-corpus";

/// Default number of chunk workers
pub const DEFAULT_WORKERS: usize = 12;

/// Default cap on identifiers returned by a search
pub const DEFAULT_MAX_RESULTS: usize = 2000;

/// Configuration for the NCBI E-utilities client
///
/// NCBI asks clients to identify themselves with `tool` and `email`, and to
/// stay below 3 requests per second (10 with an API key).
///
/// # Example
///
/// ```
/// use ncbi_corpus::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_api_key("your_api_key_here")
///     .with_email("researcher@university.edu")
///     .with_tool("corpus-builder");
///
/// assert_eq!(config.effective_rate_limit(), 10.0);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// NCBI API key, raises the rate limit to 10 requests per second
    pub api_key: Option<String>,
    /// Contact email sent with each request
    pub email: Option<String>,
    /// Tool name sent with each request
    pub tool: Option<String>,
    /// Explicit rate limit in requests per second; derived from the API key when unset
    pub rate_limit: Option<f64>,
    /// HTTP request timeout
    pub timeout: Duration,
    /// Base URL override, used for mock servers in tests
    pub base_url: Option<String>,
    /// Custom `User-Agent` header
    pub user_agent: Option<String>,
    pub retry_config: RetryConfig,
    /// Raw document cache; `None` disables caching
    pub cache_config: Option<CacheConfig>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_email<S: Into<String>>(mut self, email: S) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_tool<S: Into<String>>(mut self, tool: S) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: f64) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_timeout_seconds(self, seconds: u64) -> Self {
        self.with_timeout(Duration::from_secs(seconds))
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn with_cache(mut self, cache_config: CacheConfig) -> Self {
        self.cache_config = Some(cache_config);
        self
    }

    /// Requests per second actually enforced
    pub fn effective_rate_limit(&self) -> f64 {
        self.rate_limit.unwrap_or(if self.api_key.is_some() {
            NCBI_RATE_WITH_KEY
        } else {
            NCBI_RATE_WITHOUT_KEY
        })
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("{DEFAULT_TOOL}/{}", env!("CARGO_PKG_VERSION")))
    }

    /// `api_key`, `email`, and `tool` query parameters for every request
    pub fn build_api_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(api_key) = &self.api_key {
            params.push(("api_key".to_string(), api_key.clone()));
        }
        if let Some(email) = &self.email {
            params.push(("email".to_string(), email.clone()));
        }
        params.push((
            "tool".to_string(),
            self.tool.clone().unwrap_or_else(|| DEFAULT_TOOL.to_string()),
        ));
        params
    }

    pub fn create_rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(self.effective_rate_limit())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            email: None,
            tool: None,
            rate_limit: None,
            timeout: Duration::from_secs(30),
            base_url: None,
            user_agent: None,
            retry_config: RetryConfig::default(),
            cache_config: None,
        }
    }
}

/// In-memory cache of raw documents keyed by database and identifier group
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of documents kept
    pub max_capacity: u64,
    pub time_to_live: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 1000,
            time_to_live: Duration::from_secs(60 * 60),
        }
    }
}

/// What a run does when one chunk fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// The first chunk failure fails the whole run
    #[default]
    FailBatch,
    /// Failed chunks are recorded and left out of the corpus
    SkipChunk,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::FailBatch => "fail-batch",
            FailurePolicy::SkipChunk => "skip-chunk",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = CorpusError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "fail-batch" | "failbatch" | "fail" => Ok(FailurePolicy::FailBatch),
            "skip-chunk" | "skipchunk" | "skip" => Ok(FailurePolicy::SkipChunk),
            other => Err(CorpusError::InvalidConfig(format!(
                "unknown failure policy {other:?} (expected \"fail-batch\" or \"skip-chunk\")"
            ))),
        }
    }
}

/// Parameters of one batch run
///
/// # Example
///
/// ```
/// use ncbi_corpus::{Database, FailurePolicy, RunConfig};
///
/// let config = RunConfig::new(Database::Pmc)
///     .with_workers(4)
///     .with_failure_policy(FailurePolicy::SkipChunk)
///     .with_keep_raw(true);
///
/// assert!(config.validate().is_ok());
/// assert!(RunConfig::new(Database::Pmc).with_workers(0).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub database: Database,
    /// Requested worker count, clamped to the number of identifiers
    pub workers: usize,
    pub failure_policy: FailurePolicy,
    /// Keep the last raw document fetched by each chunk
    pub keep_raw: bool,
    /// Identifiers sent in one EFetch request
    pub ids_per_request: usize,
}

impl RunConfig {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            workers: DEFAULT_WORKERS,
            failure_policy: FailurePolicy::default(),
            keep_raw: false,
            ids_per_request: 1,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_keep_raw(mut self, keep_raw: bool) -> Self {
        self.keep_raw = keep_raw;
        self
    }

    pub fn with_ids_per_request(mut self, ids_per_request: usize) -> Self {
        self.ids_per_request = ids_per_request;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(CorpusError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.ids_per_request == 0 {
            return Err(CorpusError::InvalidConfig(
                "identifiers per request must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

//! Configuration for peer resolution and fundamentals retrieval

use crate::error::{PeerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable holding the EOD Historical Data API key
pub const API_KEY_ENV: &str = "EOD_API_KEY";

/// Legacy name of the API key variable, read when [`API_KEY_ENV`] is unset
pub const LEGACY_API_KEY_ENV: &str = "API_EOD";

/// Default EOD Historical Data API base URL
pub const DEFAULT_BASE_URL: &str = "https://eodhistoricaldata.com/api";

/// Exchanges searched by the screener, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Exchange {
    /// Deutsche Börse Xetra
    Xetra,
    /// US composite (NYSE, NASDAQ, ...)
    Us,
    /// London Stock Exchange
    Lse,
    /// Hong Kong Stock Exchange
    Hk,
    /// Shanghai Stock Exchange
    Shanghai,
}

impl Exchange {
    /// Exchange code used by the upstream API and as ticker suffix
    pub fn code(&self) -> &'static str {
        match self {
            Exchange::Xetra => "XETRA",
            Exchange::Us => "US",
            Exchange::Lse => "LSE",
            Exchange::Hk => "HK",
            Exchange::Shanghai => "SHG",
        }
    }

    /// Default search order
    pub fn defaults() -> Vec<Exchange> {
        vec![Exchange::Xetra, Exchange::Us, Exchange::Lse, Exchange::Hk]
    }

    /// All supported exchanges
    pub fn all() -> Vec<Exchange> {
        vec![
            Exchange::Xetra,
            Exchange::Us,
            Exchange::Lse,
            Exchange::Hk,
            Exchange::Shanghai,
        ]
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Exchange {
    type Err = PeerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "XETRA" | "DE" => Ok(Exchange::Xetra),
            "US" => Ok(Exchange::Us),
            "LSE" | "L" => Ok(Exchange::Lse),
            "HK" => Ok(Exchange::Hk),
            "SHG" | "SS" | "SHANGHAI" => Ok(Exchange::Shanghai),
            other => Err(PeerError::ConfigError(format!("Unknown exchange: {other}"))),
        }
    }
}

/// How candidate company names are compared during deduplication
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum NamePolicy {
    /// Only character-for-character identical names are duplicates
    #[default]
    Exact,
    /// Names whose similarity lies strictly between the bounds need a decision;
    /// identical names are duplicates without a decision
    Fuzzy {
        /// Scores at or below this are clearly different companies
        lower: f64,
        /// Scores at or above this are the same name
        upper: f64,
    },
}

impl NamePolicy {
    /// Fuzzy policy with the default bounds
    pub fn fuzzy() -> Self {
        NamePolicy::Fuzzy {
            lower: 0.8,
            upper: 1.0,
        }
    }
}

/// Configuration for peerscope operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    /// EOD Historical Data API key
    pub api_key: Option<String>,

    /// API base URL
    pub base_url: String,

    /// Exchanges searched, in priority order
    pub exchanges: Vec<Exchange>,

    /// Maximum screener results per exchange
    pub limit: u32,

    /// Name comparison policy for deduplication
    pub name_policy: NamePolicy,

    /// Cache TTL for fundamentals documents
    pub cache_ttl: Duration,

    /// Maximum number of attempts for API calls
    pub max_attempts: u32,

    /// Initial backoff duration for retries
    pub retry_backoff_base: Duration,

    /// Request timeout duration
    pub request_timeout: Duration,

    /// Maximum requests per minute
    pub rate_limit: u32,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            exchanges: Exchange::defaults(),
            limit: 50,
            name_policy: NamePolicy::Exact,
            cache_ttl: Duration::from_secs(3600), // 1 hour
            max_attempts: 3,
            retry_backoff_base: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
            rate_limit: 600,
        }
    }
}

impl PeerConfig {
    /// Create a new configuration builder
    pub fn builder() -> PeerConfigBuilder {
        PeerConfigBuilder::default()
    }

    /// Load the API key from the environment
    pub fn with_env_api_key(mut self) -> Self {
        if let Some(key) = api_key_from_env() {
            self.api_key = Some(key);
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.exchanges.is_empty() {
            return Err(PeerError::ConfigError(
                "at least one exchange must be configured".to_string(),
            ));
        }

        if self.limit == 0 {
            return Err(PeerError::ConfigError(
                "limit must be greater than 0".to_string(),
            ));
        }

        if self.max_attempts == 0 {
            return Err(PeerError::ConfigError(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit == 0 {
            return Err(PeerError::ConfigError(
                "rate_limit must be greater than 0".to_string(),
            ));
        }

        if let NamePolicy::Fuzzy { lower, upper } = self.name_policy {
            if !(0.0..=1.0).contains(&lower) || !(0.0..=1.0).contains(&upper) || lower >= upper {
                return Err(PeerError::ConfigError(format!(
                    "fuzzy bounds must satisfy 0 <= lower < upper <= 1, got {lower}..{upper}"
                )));
            }
        }

        url::Url::parse(&self.base_url)
            .map_err(|e| PeerError::ConfigError(format!("invalid base_url: {e}")))?;

        Ok(())
    }

    /// API key, or a configuration error when none is set
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            PeerError::ConfigError(format!("{API_KEY_ENV} environment variable not set"))
        })
    }
}

fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .or_else(|_| std::env::var(LEGACY_API_KEY_ENV))
        .ok()
        .filter(|key| !key.trim().is_empty())
}

/// Builder for PeerConfig
#[derive(Debug, Default)]
pub struct PeerConfigBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    exchanges: Option<Vec<Exchange>>,
    limit: Option<u32>,
    name_policy: Option<NamePolicy>,
    cache_ttl: Option<Duration>,
    max_attempts: Option<u32>,
    retry_backoff_base: Option<Duration>,
    request_timeout: Option<Duration>,
    rate_limit: Option<u32>,
}

impl PeerConfigBuilder {
    /// Set the API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Load the API key from `EOD_API_KEY` (or `API_EOD`) if not already set
    pub fn with_env_api_key(mut self) -> Self {
        if self.api_key.is_none() {
            self.api_key = api_key_from_env();
        }
        self
    }

    /// Set the API base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the exchanges searched, in priority order
    pub fn exchanges(mut self, exchanges: Vec<Exchange>) -> Self {
        self.exchanges = Some(exchanges);
        self
    }

    /// Set the per-exchange result limit
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the name comparison policy
    pub fn name_policy(mut self, policy: NamePolicy) -> Self {
        self.name_policy = Some(policy);
        self
    }

    /// Set cache TTL for fundamentals documents
    pub fn cache_ttl(mut self, duration: Duration) -> Self {
        self.cache_ttl = Some(duration);
        self
    }

    /// Set maximum attempts
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Set retry backoff base duration
    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set maximum requests per minute
    pub fn rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit = Some(per_minute);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<PeerConfig> {
        let defaults = PeerConfig::default();

        let config = PeerConfig {
            api_key: self.api_key,
            base_url: self.base_url.unwrap_or(defaults.base_url),
            exchanges: self.exchanges.unwrap_or(defaults.exchanges),
            limit: self.limit.unwrap_or(defaults.limit),
            name_policy: self.name_policy.unwrap_or(defaults.name_policy),
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            rate_limit: self.rate_limit.unwrap_or(defaults.rate_limit),
        };

        config.validate()?;
        Ok(config)
    }
}

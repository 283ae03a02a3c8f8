//! EOD Historical Data API client

use super::{FundamentalsApi, FundamentalsRecord, ScreenerApi, ScreenerQuery, ScreenerRecord};
use crate::cache::{CacheKey, ResponseCache};
use crate::config::PeerConfig;
use crate::error::{PeerError, Result};
use crate::retry::RetryPolicy;
use crate::ticker::Ticker;
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

const PROVIDER: &str = "EOD Historical Data";

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Screener response body
#[derive(Debug, Deserialize)]
struct ScreenerEnvelope {
    data: Vec<ScreenerRecord>,
}

/// EOD Historical Data API client
///
/// Constructed once by the caller and passed by reference to the resolver
/// and the fundamentals functions. Calls are rate limited, transient
/// failures are retried and decoded responses are cached in memory.
#[derive(Clone)]
pub struct EodClient {
    client: Client,
    api_key: String,
    base_url: Url,
    rate_limiter: SharedRateLimiter,
    retry: RetryPolicy,
    cache: ResponseCache,
}

impl fmt::Debug for EodClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EodClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl EodClient {
    /// Create a client from a validated configuration
    pub fn new(config: &PeerConfig) -> Result<Self> {
        config.validate()?;
        let api_key = config.require_api_key()?.to_string();

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| PeerError::ConfigError(format!("invalid base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(PeerError::ConfigError(format!(
                "base_url cannot carry a path: {base_url}"
            )));
        }

        let client = Client::builder().timeout(config.request_timeout).build()?;

        let quota = Quota::per_minute(NonZeroU32::new(config.rate_limit).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client,
            api_key,
            base_url,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            retry: RetryPolicy::from_config(config),
            cache: ResponseCache::new(config.cache_ttl),
        })
    }

    /// Create from environment variable EOD_API_KEY with default settings
    pub fn from_env() -> Result<Self> {
        Self::new(&PeerConfig::default().with_env_api_key())
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the request URL for `segments` below the base URL
    fn endpoint_url(&self, segments: &[&str], params: &[(&'static str, String)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api_token", &self.api_key);
            query.append_pair("fmt", "json");
            for (name, value) in params {
                query.append_pair(name, value);
            }
        }
        url
    }

    /// GET a JSON document, going through cache, retry and rate limiter
    async fn get_json(&self, segments: &[&str], params: Vec<(&'static str, String)>) -> Result<Value> {
        let endpoint = segments.join("/");
        let key = CacheKey::new(
            endpoint.clone(),
            params.iter().map(|(name, value)| (*name, value.clone())),
        );
        let url = self.endpoint_url(segments, &params);

        self.cache
            .get_or_fetch(key, || {
                self.retry.execute(&endpoint, || self.fetch(url.clone()))
            })
            .await
    }

    async fn fetch(&self, url: Url) -> Result<Value> {
        self.rate_limiter.until_ready().await;

        let path = url.path().to_string();
        debug!(%path, "GET");

        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(PeerError::NotFound(path)),
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(PeerError::RateLimitExceeded {
                    provider: PROVIDER.to_string(),
                });
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(PeerError::ConfigError(format!(
                    "API key rejected by {PROVIDER}"
                )));
            }
            _ => {}
        }

        let body = response.error_for_status()?.text().await?;

        serde_json::from_str(&body)
            .map_err(|e| PeerError::ServiceError(format!("malformed response from {path}: {e}")))
    }
}

#[async_trait]
impl ScreenerApi for EodClient {
    #[instrument(skip(self), fields(filters = %query.filters_param()))]
    async fn screen(&self, query: &ScreenerQuery) -> Result<Vec<ScreenerRecord>> {
        let mut params = vec![
            ("filters", query.filters_param()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(sort) = query.sort.as_param() {
            params.push(("sort", sort.to_string()));
        }

        let data = self.get_json(&["screener"], params).await.map_err(|e| match e {
            PeerError::NotFound(path) => {
                PeerError::ServiceError(format!("screener endpoint not found: {path}"))
            }
            other => other,
        })?;

        let envelope: ScreenerEnvelope = serde_json::from_value(data).map_err(|e| {
            PeerError::ServiceError(format!("unexpected screener response shape: {e}"))
        })?;

        debug!(rows = envelope.data.len(), "Screener returned");
        Ok(envelope.data)
    }
}

#[async_trait]
impl FundamentalsApi for EodClient {
    #[instrument(skip(self), fields(ticker = %ticker))]
    async fn fundamentals(&self, ticker: &Ticker) -> Result<FundamentalsRecord> {
        let symbol = ticker.to_string();

        let no_record = || PeerError::NoFundamentals {
            ticker: symbol.clone(),
            section: "fundamentals".to_string(),
        };

        let data = match self.get_json(&["fundamentals", symbol.as_str()], Vec::new()).await {
            Ok(data) => data,
            Err(PeerError::NotFound(_)) => return Err(no_record()),
            Err(e) => return Err(e),
        };

        let is_empty = match &data {
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        };
        if is_empty {
            return Err(no_record());
        }
        if !data.is_object() {
            return Err(PeerError::ServiceError(format!(
                "unexpected fundamentals shape for {symbol}: {data}"
            )));
        }

        serde_json::from_value(data).map_err(|e| {
            PeerError::ServiceError(format!("unexpected fundamentals shape for {symbol}: {e}"))
        })
    }
}

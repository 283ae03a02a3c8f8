//! Upstream service contracts and the EOD Historical Data client
//!
//! The resolver and the fundamentals functions only see the
//! [`ScreenerApi`] and [`FundamentalsApi`] traits; [`EodClient`] implements
//! both over HTTP.

pub mod eod;

pub use eod::EodClient;

use crate::config::Exchange;
use crate::error::Result;
use crate::ticker::Ticker;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Screener column usable in an equality filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenerField {
    Code,
    Exchange,
    Industry,
    Sector,
}

impl ScreenerField {
    /// Column name in the upstream filter syntax
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenerField::Code => "code",
            ScreenerField::Exchange => "exchange",
            ScreenerField::Industry => "industry",
            ScreenerField::Sector => "sector",
        }
    }
}

/// Equality filter `field = value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenerFilter {
    pub field: ScreenerField,
    pub value: String,
}

impl ScreenerFilter {
    /// Create an equality filter
    pub fn equals(field: ScreenerField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// Sort order of screener results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenerSort {
    /// Upstream default order
    #[default]
    Unsorted,
    /// Largest market capitalization first
    MarketCapDesc,
}

impl ScreenerSort {
    /// Sort parameter value, if any
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            ScreenerSort::Unsorted => None,
            ScreenerSort::MarketCapDesc => Some("market_capitalization.desc"),
        }
    }
}

/// A screener request: equality filters, result limit and sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenerQuery {
    pub filters: Vec<ScreenerFilter>,
    pub limit: u32,
    pub sort: ScreenerSort,
}

impl ScreenerQuery {
    /// Exact ticker-code lookup on one exchange
    pub fn by_code(code: &str, exchange: Exchange) -> Self {
        Self {
            filters: vec![
                ScreenerFilter::equals(ScreenerField::Code, code),
                ScreenerFilter::equals(ScreenerField::Exchange, exchange.code().to_ascii_lowercase()),
            ],
            limit: 10,
            sort: ScreenerSort::Unsorted,
        }
    }

    /// Listings of one industry on one exchange, largest first
    pub fn by_industry(industry: &str, exchange: Exchange, limit: u32) -> Self {
        Self {
            filters: vec![
                ScreenerFilter::equals(ScreenerField::Industry, industry),
                ScreenerFilter::equals(ScreenerField::Exchange, exchange.code().to_ascii_lowercase()),
            ],
            limit,
            sort: ScreenerSort::MarketCapDesc,
        }
    }

    /// Filters rendered in the upstream JSON syntax `[["field","=","value"],...]`
    pub fn filters_param(&self) -> String {
        let filters: Vec<serde_json::Value> = self
            .filters
            .iter()
            .map(|f| serde_json::json!([f.field.as_str(), "=", f.value]))
            .collect();
        serde_json::Value::Array(filters).to_string()
    }
}

/// One screener result row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerRecord {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub market_capitalization: Option<f64>,
}

impl fmt::Display for ScreenerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// Raw fundamentals document for one ticker
///
/// Sections are kept as JSON and interpreted by [`crate::fundamentals`];
/// a section the upstream omits is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsRecord {
    #[serde(rename = "General", default)]
    pub general: Option<serde_json::Value>,
    #[serde(rename = "Highlights", default)]
    pub highlights: Option<serde_json::Value>,
    #[serde(rename = "Financials", default)]
    pub financials: Option<serde_json::Value>,
}

/// Market screener service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScreenerApi: Send + Sync {
    /// Run a screener query and return the result rows in upstream order
    async fn screen(&self, query: &ScreenerQuery) -> Result<Vec<ScreenerRecord>>;
}

/// Fundamentals service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FundamentalsApi: Send + Sync {
    /// Fetch the fundamentals document of one ticker
    ///
    /// A ticker unknown to the upstream yields `PeerError::NoFundamentals`.
    async fn fundamentals(&self, ticker: &Ticker) -> Result<FundamentalsRecord>;
}

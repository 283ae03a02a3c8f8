//! Ticker symbols with optional market suffix

use crate::config::Exchange;
use crate::error::{PeerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A security code, optionally carrying the market suffix (`AAPL.US`)
///
/// Only suffixes naming a known [`Exchange`] are split off, so share classes
/// such as `BRK.B` keep their dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Ticker {
    code: String,
    exchange: Option<Exchange>,
}

impl Ticker {
    /// Ticker listed on a known exchange
    pub fn new(code: impl Into<String>, exchange: Exchange) -> Self {
        Self {
            code: code.into().to_ascii_uppercase(),
            exchange: Some(exchange),
        }
    }

    /// Code without market suffix, as queried against the screener
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Exchange named by the suffix, if any
    pub fn exchange(&self) -> Option<Exchange> {
        self.exchange
    }

    /// Same code with the suffix removed
    pub fn strip_suffix(&self) -> Self {
        Self {
            code: self.code.clone(),
            exchange: None,
        }
    }

    /// Same code with the suffix of `exchange`
    pub fn with_exchange(&self, exchange: Exchange) -> Self {
        Self {
            code: self.code.clone(),
            exchange: Some(exchange),
        }
    }
}

impl FromStr for Ticker {
    type Err = PeerError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(PeerError::InvalidTicker(s.to_string()));
        }

        if let Some((code, suffix)) = s.rsplit_once('.') {
            if let Ok(exchange) = suffix.parse::<Exchange>() {
                if code.is_empty() {
                    return Err(PeerError::InvalidTicker(s.to_string()));
                }
                return Ok(Self::new(code, exchange));
            }
        }

        Ok(Self {
            code: s.to_ascii_uppercase(),
            exchange: None,
        })
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exchange {
            Some(exchange) => write!(f, "{}.{}", self.code, exchange.code()),
            None => f.write_str(&self.code),
        }
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.to_string()
    }
}

impl TryFrom<String> for Ticker {
    type Error = PeerError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

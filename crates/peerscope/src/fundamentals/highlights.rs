//! The "Highlights" section: headline KPIs of one company

use super::{Batch, parse_metric};
use crate::api::{FundamentalsApi, FundamentalsRecord};
use crate::error::{PeerError, Result};
use crate::ticker::Ticker;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, instrument};

const SECTION: &str = "Highlights";

/// Headline KPIs of one ticker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlights {
    pub ticker: Ticker,
    /// End of the quarter the figures refer to
    pub most_recent_quarter: Option<NaiveDate>,
    metrics: BTreeMap<String, Option<f64>>,
}

impl Highlights {
    /// Extract the highlights from a fundamentals document
    pub fn from_record(ticker: &Ticker, record: &FundamentalsRecord) -> Result<Self> {
        let missing = || PeerError::NoFundamentals {
            ticker: ticker.to_string(),
            section: SECTION.to_string(),
        };

        let section = record
            .highlights
            .as_ref()
            .filter(|section| !section.is_null())
            .ok_or_else(missing)?;
        let Value::Object(fields) = section else {
            return Err(PeerError::ServiceError(format!(
                "{ticker} {SECTION} is not an object"
            )));
        };
        if fields.is_empty() {
            return Err(missing());
        }

        let mut highlights = Self {
            ticker: ticker.clone(),
            most_recent_quarter: None,
            metrics: BTreeMap::new(),
        };

        for (name, value) in fields {
            if name == "MostRecentQuarter" {
                highlights.most_recent_quarter = value
                    .as_str()
                    .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
                continue;
            }
            let metric = parse_metric(value)
                .map_err(|e| PeerError::ServiceError(format!("{ticker} {SECTION}.{name}: {e}")))?;
            highlights.metrics.insert(name.clone(), metric);
        }

        Ok(highlights)
    }

    /// Value of one metric, `None` when absent or not reported
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied().flatten()
    }

    /// All metrics, including those without a value
    pub fn metrics(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.metrics.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Fetch the highlights of one ticker
#[instrument(skip(api))]
pub async fn fetch_highlights(api: &dyn FundamentalsApi, ticker: &Ticker) -> Result<Highlights> {
    let record = api.fundamentals(ticker).await?;
    Highlights::from_record(ticker, &record)
}

/// Fetch the highlights of each ticker, skipping tickers without them
pub async fn highlights(api: &dyn FundamentalsApi, tickers: &[Ticker]) -> Result<Batch<Highlights>> {
    let mut batch = Batch::with_total(tickers.len());

    for ticker in tickers {
        let result = fetch_highlights(api, ticker).await;
        batch.push(ticker, result)?;
    }

    info!(fetched = batch.report.fetched, total = batch.report.total, "{}", batch.report);
    Ok(batch)
}

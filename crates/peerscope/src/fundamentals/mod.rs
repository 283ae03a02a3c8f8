//! Financial statements and headline KPIs
//!
//! Bulk requests skip tickers that lack the requested section and report how
//! many were skipped; any other failure aborts the batch.

pub mod highlights;
pub mod statement;

pub use highlights::{Highlights, fetch_highlights, highlights};
pub use statement::{Frequency, StatementKind, StatementPeriod, StatementTable, fetch_statement, statements};

use crate::error::{PeerError, Result};
use crate::ticker::Ticker;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Interpret one upstream metric
///
/// Numbers and numeric strings are parsed; `null` and empty strings are
/// absent. Anything else, including strings such as `"NaN"` or `"inf"` that
/// parse to a non-finite float, is rejected with a description of the value.
pub fn parse_metric(value: &Value) -> std::result::Result<Option<f64>, String> {
    let metric = match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("number out of range: {n}")),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>()
                .map(Some)
                .map_err(|_| format!("not a number: {s:?}"))
        }
        other => Err(format!("not a number: {other}")),
    }?;

    match metric {
        Some(v) if !v.is_finite() => Err(format!("not a finite number: {value}")),
        _ => Ok(metric),
    }
}

/// Outcome counts of a bulk request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    /// Tickers fetched successfully
    pub fetched: usize,
    /// Tickers skipped for lack of data
    pub skipped: Vec<Ticker>,
    /// Tickers requested
    pub total: usize,
}

impl FetchReport {
    /// Whether every requested ticker was fetched
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

impl fmt::Display for FetchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} values were not available.", self.skipped.len())
    }
}

/// Items of a bulk request together with its report
#[derive(Debug, Clone, Serialize)]
pub struct Batch<T> {
    pub items: Vec<T>,
    pub report: FetchReport,
}

impl<T> Batch<T> {
    fn with_total(total: usize) -> Self {
        Self {
            items: Vec::with_capacity(total),
            report: FetchReport {
                total,
                ..FetchReport::default()
            },
        }
    }

    /// Account for one ticker's result
    fn push(&mut self, ticker: &Ticker, result: Result<T>) -> Result<()> {
        match result {
            Ok(item) => {
                self.items.push(item);
                self.report.fetched += 1;
                Ok(())
            }
            Err(PeerError::NoFundamentals { section, .. }) => {
                debug!(%ticker, %section, "Skipping ticker without data");
                self.report.skipped.push(ticker.clone());
                Ok(())
            }
            Err(e) => Err(e.into_service_error()),
        }
    }
}

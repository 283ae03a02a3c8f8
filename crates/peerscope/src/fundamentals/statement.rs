//! Balance sheet, income statement and cash flow tables

use super::{Batch, parse_metric};
use crate::api::{FundamentalsApi, FundamentalsRecord};
use crate::error::{PeerError, Result};
use crate::ticker::Ticker;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::{info, instrument};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Financial statement type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum StatementKind {
    #[default]
    BalanceSheet,
    IncomeStatement,
    CashFlow,
}

impl StatementKind {
    /// Section name in the fundamentals document
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::BalanceSheet => "Balance_Sheet",
            StatementKind::IncomeStatement => "Income_Statement",
            StatementKind::CashFlow => "Cash_Flow",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatementKind {
    type Err = PeerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "balance_sheet" | "balance" => Ok(StatementKind::BalanceSheet),
            "income_statement" | "income" => Ok(StatementKind::IncomeStatement),
            "cash_flow" | "cashflow" => Ok(StatementKind::CashFlow),
            _ => Err(PeerError::ConfigError(format!(
                "unknown statement type '{s}' (expected Balance_Sheet, Income_Statement or Cash_Flow)"
            ))),
        }
    }
}

/// Reporting frequency of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Frequency {
    #[default]
    Quarterly,
    Yearly,
}

impl Frequency {
    /// Key in the fundamentals document
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = PeerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quarterly" | "q" => Ok(Frequency::Quarterly),
            "yearly" | "annual" | "y" => Ok(Frequency::Yearly),
            _ => Err(PeerError::ConfigError(format!(
                "unknown frequency '{s}' (expected quarterly or yearly)"
            ))),
        }
    }
}

/// One reporting period of a statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementPeriod {
    /// Period end date
    pub date: NaiveDate,
    pub filing_date: Option<NaiveDate>,
    pub currency: Option<String>,
    /// Line items; `None` when the upstream reports no value
    pub values: BTreeMap<String, Option<f64>>,
}

impl StatementPeriod {
    fn from_fields(ticker: &Ticker, date: NaiveDate, fields: &Map<String, Value>) -> Result<Self> {
        let mut period = Self {
            date,
            filing_date: None,
            currency: None,
            values: BTreeMap::new(),
        };

        for (name, value) in fields {
            match name.as_str() {
                "date" => {}
                "filing_date" => {
                    period.filing_date = value
                        .as_str()
                        .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok());
                }
                "currency_symbol" => {
                    period.currency = value.as_str().map(str::to_string);
                }
                _ => {
                    let metric = parse_metric(value).map_err(|e| {
                        PeerError::ServiceError(format!("{ticker} {date} {name}: {e}"))
                    })?;
                    period.values.insert(name.clone(), metric);
                }
            }
        }

        Ok(period)
    }

    /// Value of one line item
    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied().flatten()
    }
}

/// All recorded periods of one statement for one ticker, oldest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementTable {
    pub ticker: Ticker,
    pub kind: StatementKind,
    pub frequency: Frequency,
    periods: BTreeMap<NaiveDate, StatementPeriod>,
}

impl StatementTable {
    /// Extract a statement from a fundamentals document
    ///
    /// A missing or empty section is `NoFundamentals`; a section of an
    /// unexpected shape is a `ServiceError`.
    pub fn from_record(
        ticker: &Ticker,
        record: &FundamentalsRecord,
        kind: StatementKind,
        frequency: Frequency,
    ) -> Result<Self> {
        let missing = || PeerError::NoFundamentals {
            ticker: ticker.to_string(),
            section: format!("Financials::{kind}::{frequency}"),
        };

        let section = record
            .financials
            .as_ref()
            .and_then(|financials| financials.get(kind.as_str()))
            .and_then(|statement| statement.get(frequency.as_str()))
            .filter(|section| !section.is_null())
            .ok_or_else(missing)?;

        let Value::Object(entries) = section else {
            return Err(PeerError::ServiceError(format!(
                "{ticker} {kind} {frequency} is not an object"
            )));
        };
        if entries.is_empty() {
            return Err(missing());
        }

        let mut periods = BTreeMap::new();
        for (key, entry) in entries {
            let date = NaiveDate::parse_from_str(key, DATE_FORMAT).map_err(|e| {
                PeerError::ServiceError(format!("{ticker} {kind}: bad period '{key}': {e}"))
            })?;
            let Value::Object(fields) = entry else {
                return Err(PeerError::ServiceError(format!(
                    "{ticker} {kind} {date} is not an object"
                )));
            };
            periods.insert(date, StatementPeriod::from_fields(ticker, date, fields)?);
        }

        Ok(Self {
            ticker: ticker.clone(),
            kind,
            frequency,
            periods,
        })
    }

    /// Periods in chronological order
    pub fn periods(&self) -> impl Iterator<Item = &StatementPeriod> {
        self.periods.values()
    }

    /// Most recent period
    pub fn latest(&self) -> Option<&StatementPeriod> {
        self.periods.values().next_back()
    }

    /// Period ending on `date`
    pub fn period(&self, date: NaiveDate) -> Option<&StatementPeriod> {
        self.periods.get(&date)
    }

    /// One line item across all periods, oldest first
    pub fn field(&self, name: &str) -> Vec<(NaiveDate, Option<f64>)> {
        self.periods
            .iter()
            .map(|(date, period)| (*date, period.value(name)))
            .collect()
    }

    /// Names of every line item reported in any period
    pub fn field_names(&self) -> BTreeSet<&str> {
        self.periods
            .values()
            .flat_map(|period| period.values.keys().map(String::as_str))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

/// Fetch one statement of one ticker
#[instrument(skip(api))]
pub async fn fetch_statement(
    api: &dyn FundamentalsApi,
    ticker: &Ticker,
    kind: StatementKind,
    frequency: Frequency,
) -> Result<StatementTable> {
    let record = api.fundamentals(ticker).await?;
    StatementTable::from_record(ticker, &record, kind, frequency)
}

/// Fetch one statement for each ticker, skipping tickers without it
pub async fn statements(
    api: &dyn FundamentalsApi,
    tickers: &[Ticker],
    kind: StatementKind,
    frequency: Frequency,
) -> Result<Batch<StatementTable>> {
    let mut batch = Batch::with_total(tickers.len());

    for ticker in tickers {
        let result = fetch_statement(api, ticker, kind, frequency).await;
        batch.push(ticker, result)?;
    }

    info!(%kind, %frequency, fetched = batch.report.fetched, total = batch.report.total, "{}", batch.report);
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockFundamentalsApi;
    use serde_json::json;

    fn record(financials: Value) -> FundamentalsRecord {
        FundamentalsRecord {
            financials: Some(financials),
            ..FundamentalsRecord::default()
        }
    }

    fn balance_sheet() -> FundamentalsRecord {
        record(json!({
            "Balance_Sheet": {
                "currency_symbol": "USD",
                "quarterly": {
                    "2023-06-30": {
                        "date": "2023-06-30",
                        "filing_date": "2023-08-04",
                        "currency_symbol": "USD",
                        "totalAssets": "335038000000.00",
                        "cash": null
                    },
                    "2023-03-31": {
                        "date": "2023-03-31",
                        "filing_date": null,
                        "currency_symbol": "USD",
                        "totalAssets": "332160000000.00",
                        "cash": "24687000000.00"
                    }
                },
                "yearly": {}
            }
        }))
    }

    fn ticker() -> Ticker {
        "AAPL.US".parse().unwrap()
    }

    #[test]
    fn test_statement_kind_parsing() {
        assert_eq!("Balance_Sheet".parse::<StatementKind>().unwrap(), StatementKind::BalanceSheet);
        assert_eq!("income-statement".parse::<StatementKind>().unwrap(), StatementKind::IncomeStatement);
        assert_eq!("cash_flow".parse::<StatementKind>().unwrap(), StatementKind::CashFlow);
        assert!("ratios".parse::<StatementKind>().is_err());
        assert_eq!("annual".parse::<Frequency>().unwrap(), Frequency::Yearly);
        assert_eq!(Frequency::default(), Frequency::Quarterly);
    }

    #[test]
    fn test_table_is_chronological() {
        let table = StatementTable::from_record(
            &ticker(),
            &balance_sheet(),
            StatementKind::BalanceSheet,
            Frequency::Quarterly,
        )
        .unwrap();

        let dates: Vec<String> = table.periods().map(|p| p.date.to_string()).collect();
        assert_eq!(dates, vec!["2023-03-31", "2023-06-30"]);

        let latest = table.latest().unwrap();
        assert_eq!(latest.value("totalAssets"), Some(335_038_000_000.0));
        assert_eq!(latest.value("cash"), None);
        assert_eq!(latest.currency.as_deref(), Some("USD"));
        assert_eq!(latest.filing_date, NaiveDate::from_ymd_opt(2023, 8, 4));
        assert_eq!(table.field_names().into_iter().collect::<Vec<_>>(), vec!["cash", "totalAssets"]);
    }

    #[test]
    fn test_missing_section_is_no_fundamentals() {
        for kind in [StatementKind::IncomeStatement, StatementKind::BalanceSheet] {
            let frequency = if kind == StatementKind::BalanceSheet {
                Frequency::Yearly
            } else {
                Frequency::Quarterly
            };
            let err = StatementTable::from_record(&ticker(), &balance_sheet(), kind, frequency)
                .unwrap_err();
            assert!(matches!(err, PeerError::NoFundamentals { .. }), "{kind} {frequency}");
        }

        let err = StatementTable::from_record(
            &ticker(),
            &FundamentalsRecord::default(),
            StatementKind::CashFlow,
            Frequency::Quarterly,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "No fundamentals for AAPL.US: missing Financials::Cash_Flow::quarterly"
        );
    }

    #[test]
    fn test_non_numeric_value_is_malformed() {
        let record = record(json!({
            "Cash_Flow": {"quarterly": {"2023-06-30": {"freeCashFlow": "lots"}}}
        }));
        let err = StatementTable::from_record(
            &ticker(),
            &record,
            StatementKind::CashFlow,
            Frequency::Quarterly,
        )
        .unwrap_err();
        assert!(matches!(err, PeerError::ServiceError(_)));
    }

    #[test]
    fn test_bad_period_key_is_malformed() {
        let record = record(json!({
            "Cash_Flow": {"quarterly": {"last quarter": {"freeCashFlow": "1"}}}
        }));
        let err = StatementTable::from_record(
            &ticker(),
            &record,
            StatementKind::CashFlow,
            Frequency::Quarterly,
        )
        .unwrap_err();
        assert!(matches!(err, PeerError::ServiceError(_)));
    }

    #[tokio::test]
    async fn test_bulk_statements_skip_missing() {
        let mut mock = MockFundamentalsApi::new();
        mock.expect_fundamentals().returning(|ticker| {
            if ticker.code() == "AAPL" {
                Ok(balance_sheet())
            } else {
                Ok(FundamentalsRecord::default())
            }
        });

        let tickers: Vec<Ticker> = ["AAPL.US", "BCOR.US"].iter().map(|t| t.parse().unwrap()).collect();
        let batch = statements(&mock, &tickers, StatementKind::BalanceSheet, Frequency::Quarterly)
            .await
            .unwrap();

        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.items[0].ticker, ticker());
        assert_eq!(batch.report.skipped, vec![tickers[1].clone()]);
        assert_eq!(batch.report.to_string(), "1 values were not available.");
    }

    #[tokio::test]
    async fn test_bulk_statements_abort_on_service_error() {
        let mut mock = MockFundamentalsApi::new();
        mock.expect_fundamentals()
            .returning(|_| Err(PeerError::ServiceError("upstream down".to_string())));

        let tickers = vec![ticker()];
        let err = statements(&mock, &tickers, StatementKind::BalanceSheet, Frequency::Quarterly)
            .await
            .unwrap_err();
        assert!(matches!(err, PeerError::ServiceError(_)));
    }
}

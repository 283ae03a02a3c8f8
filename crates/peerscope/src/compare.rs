//! KPI overview across tickers and focal-vs-group comparison

use crate::api::FundamentalsApi;
use crate::error::{PeerError, Result};
use crate::fundamentals::{FetchReport, Highlights, highlights};
use crate::ticker::Ticker;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// Metrics compared, in display order
pub const KPIS: [&str; 7] = [
    "EarningsShare",
    "EPSEstimateCurrentYear",
    "ProfitMargin",
    "OperatingMarginTTM",
    "ReturnOnAssetsTTM",
    "QuarterlyRevenueGrowthYOY",
    "QuarterlyEarningsGrowthYOY",
];

/// Metric × ticker table
///
/// Rows follow [`KPIS`] first, then every other metric any ticker reports in
/// name order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketOverview {
    tickers: Vec<Ticker>,
    metrics: Vec<String>,
    /// `cells[metric][ticker]`
    cells: Vec<Vec<Option<f64>>>,
}

impl MarketOverview {
    /// Build the table from highlights; a ticker given twice keeps its first entry
    pub fn from_highlights(highlights: &[Highlights]) -> Self {
        let mut tickers: Vec<Ticker> = Vec::with_capacity(highlights.len());
        let mut columns: Vec<&Highlights> = Vec::with_capacity(highlights.len());
        for h in highlights {
            if !tickers.contains(&h.ticker) {
                tickers.push(h.ticker.clone());
                columns.push(h);
            }
        }

        let others: BTreeSet<&str> = columns
            .iter()
            .flat_map(|h| h.metrics().map(|(name, _)| name))
            .filter(|name| !KPIS.contains(name))
            .collect();
        let metrics: Vec<String> = KPIS
            .iter()
            .copied()
            .chain(others)
            .map(str::to_string)
            .collect();

        let cells = metrics
            .iter()
            .map(|metric| columns.iter().map(|h| h.get(metric)).collect())
            .collect();

        Self {
            tickers,
            metrics,
            cells,
        }
    }

    /// Tickers in column order
    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    /// Metrics in row order
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Value of `metric` for `ticker`
    pub fn value(&self, metric: &str, ticker: &Ticker) -> Option<f64> {
        let row = self.metrics.iter().position(|m| m == metric)?;
        let column = self.tickers.iter().position(|t| t == ticker)?;
        self.cells[row][column]
    }

    /// Render as a table with one row per metric
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        let mut header = vec!["Metric".to_string()];
        header.extend(self.tickers.iter().map(ToString::to_string));
        table.set_header(header);

        for (metric, row) in self.metrics.iter().zip(&self.cells) {
            let mut cells = vec![metric.clone()];
            cells.extend(row.iter().map(|v| format_value(*v)));
            table.add_row(cells);
        }
        table
    }
}

/// Fetch highlights for `tickers` and build the overview
///
/// Tickers without highlights are left out and counted in the report.
pub async fn market_overview(
    api: &dyn FundamentalsApi,
    tickers: &[Ticker],
) -> Result<(MarketOverview, FetchReport)> {
    let batch = highlights(api, tickers).await?;
    Ok((MarketOverview::from_highlights(&batch.items), batch.report))
}

/// One metric of a [`GroupComparison`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub metric: String,
    pub focal: Option<f64>,
    /// Mean over the other tickers that report the metric
    pub average: Option<f64>,
    /// Number of tickers the mean was taken over
    pub peers_counted: usize,
}

/// Focal ticker against the mean of the rest of its group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupComparison {
    pub focal: Ticker,
    pub rows: Vec<ComparisonRow>,
}

impl GroupComparison {
    /// Row of one metric
    pub fn row(&self, metric: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.metric == metric)
    }

    /// Render as a two-column table: focal value and group average
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Metric".to_string(), self.focal.to_string(), "Market".to_string()]);

        for row in &self.rows {
            table.add_row(vec![
                row.metric.to_string(),
                format_value(row.focal),
                format_value(row.average),
            ]);
        }
        table
    }
}

/// Compare `focal` with the average of the other tickers in `overview`
///
/// The focal ticker's own value never enters the average. A metric no other
/// ticker reports has no average.
pub fn group_average(overview: &MarketOverview, focal: &Ticker) -> Result<GroupComparison> {
    let column = overview
        .tickers
        .iter()
        .position(|t| t == focal)
        .ok_or_else(|| PeerError::NotFound(format!("{focal} is not part of the overview")))?;

    let rows = overview
        .metrics
        .iter()
        .zip(&overview.cells)
        .map(|(metric, row)| {
            let peers: Vec<f64> = row
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != column)
                .filter_map(|(_, v)| *v)
                .collect();

            let average = if peers.is_empty() {
                None
            } else {
                Some(peers.iter().sum::<f64>() / peers.len() as f64)
            };

            ComparisonRow {
                metric: metric.clone(),
                focal: row[column],
                average,
                peers_counted: peers.len(),
            }
        })
        .collect();

    debug!(%focal, group = overview.tickers.len(), "Group average computed");
    Ok(GroupComparison {
        focal: focal.clone(),
        rows,
    })
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FundamentalsRecord, MockFundamentalsApi};
    use serde_json::json;

    fn highlights(ticker: &str, values: serde_json::Value) -> Highlights {
        let record = FundamentalsRecord {
            highlights: Some(values),
            ..FundamentalsRecord::default()
        };
        Highlights::from_record(&ticker.parse().unwrap(), &record).unwrap()
    }

    fn overview() -> MarketOverview {
        MarketOverview::from_highlights(&[
            highlights("T1.US", json!({"EarningsShare": 2.0, "ProfitMargin": 0.1})),
            highlights("T2.US", json!({"EarningsShare": 4.0, "ProfitMargin": null})),
            highlights("T3.US", json!({"EarningsShare": 2.0, "ProfitMargin": 0.3})),
        ])
    }

    #[test]
    fn test_overview_layout() {
        let overview = overview();
        let t2: Ticker = "T2.US".parse().unwrap();

        assert_eq!(overview.tickers().len(), 3);
        assert_eq!(overview.value("EarningsShare", &t2), Some(4.0));
        assert_eq!(overview.value("ProfitMargin", &t2), None);
        assert_eq!(overview.value("ReturnOnAssetsTTM", &t2), None);
    }

    #[test]
    fn test_average_excludes_focal() {
        let comparison = group_average(&overview(), &"T1.US".parse().unwrap()).unwrap();

        let eps = comparison.row("EarningsShare").unwrap();
        assert_eq!(eps.focal, Some(2.0));
        assert_eq!(eps.average, Some(3.0));
        assert_eq!(eps.peers_counted, 2);

        // only T3 reports a margin among the peers
        let margin = comparison.row("ProfitMargin").unwrap();
        assert_eq!(margin.average, Some(0.3));
        assert_eq!(margin.peers_counted, 1);

        let roa = comparison.row("ReturnOnAssetsTTM").unwrap();
        assert_eq!(roa.average, None);
        assert_eq!(comparison.rows.len(), KPIS.len());
    }

    #[test]
    fn test_focal_missing_is_not_found() {
        let err = group_average(&overview(), &"T9.US".parse().unwrap()).unwrap_err();
        assert!(matches!(err, PeerError::NotFound(_)));
    }

    #[test]
    fn test_single_ticker_group_has_no_average() {
        let overview = MarketOverview::from_highlights(&[highlights(
            "T1.US",
            json!({"EarningsShare": 2.0}),
        )]);
        let comparison = group_average(&overview, &"T1.US".parse().unwrap()).unwrap();
        assert!(comparison.rows.iter().all(|r| r.average.is_none()));
    }

    #[test]
    fn test_average_over_reported_metrics() {
        let overview = MarketOverview::from_highlights(&[
            highlights("T1.US", json!({"EPS": 1.0, "Margin": null})),
            highlights("T2.US", json!({"EPS": 3.0, "Margin": 0.2})),
        ]);
        assert_eq!(&overview.metrics()[KPIS.len()..], ["EPS", "Margin"]);

        let comparison = group_average(&overview, &"T1.US".parse().unwrap()).unwrap();

        let eps = comparison.row("EPS").unwrap();
        assert_eq!(eps.focal, Some(1.0));
        assert_eq!(eps.average, Some(3.0));

        let margin = comparison.row("Margin").unwrap();
        assert_eq!(margin.focal, None);
        assert_eq!(margin.average, Some(0.2));
        assert_eq!(comparison.rows.len(), KPIS.len() + 2);
    }

    #[test]
    fn test_non_finite_value_is_rejected() {
        let record = FundamentalsRecord {
            highlights: Some(json!({"EarningsShare": "NaN"})),
            ..FundamentalsRecord::default()
        };
        let err = Highlights::from_record(&"T2.US".parse().unwrap(), &record).unwrap_err();
        assert!(matches!(err, PeerError::ServiceError(_)));
    }

    #[test]
    fn test_tables_render_every_metric() {
        let rendered = overview().to_table().to_string();
        for metric in KPIS {
            assert!(rendered.contains(metric), "{metric} missing");
        }

        let comparison = group_average(&overview(), &"T1.US".parse().unwrap()).unwrap();
        let rendered = comparison.to_table().to_string();
        assert!(rendered.contains("Market"));
        assert!(rendered.contains("3.0000"));
    }

    #[tokio::test]
    async fn test_market_overview_skips_missing() {
        let mut mock = MockFundamentalsApi::new();
        mock.expect_fundamentals().returning(|ticker| {
            if ticker.code() == "T2" {
                return Ok(FundamentalsRecord::default());
            }
            Ok(FundamentalsRecord {
                highlights: Some(json!({"EarningsShare": 1.5})),
                ..FundamentalsRecord::default()
            })
        });

        let tickers: Vec<Ticker> = ["T1.US", "T2.US", "T3.US"]
            .iter()
            .map(|t| t.parse().unwrap())
            .collect();
        let (overview, report) = market_overview(&mock, &tickers).await.unwrap();

        assert_eq!(overview.tickers().len(), 2);
        assert_eq!(report.to_string(), "1 values were not available.");
    }
}

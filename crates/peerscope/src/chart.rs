//! Time series of statement line items and sinks that draw them

use crate::error::Result;
use crate::fundamentals::StatementTable;
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;

/// Dated values of one line item, oldest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub label: String,
    points: Vec<(NaiveDate, f64)>,
}

impl TimeSeries {
    /// Build a series from points in any order
    pub fn new(label: impl Into<String>, mut points: Vec<(NaiveDate, f64)>) -> Self {
        points.sort_by_key(|(date, _)| *date);
        Self {
            label: label.into(),
            points,
        }
    }

    /// Series of `field` from a statement; periods without a value are left out
    pub fn from_statement(table: &StatementTable, field: &str) -> Self {
        let points = table
            .field(field)
            .into_iter()
            .filter_map(|(date, value)| value.map(|v| (date, v)))
            .collect();
        Self::new(format!("{} {field}", table.ticker), points)
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Destination for a rendered series
pub trait ChartSink {
    /// Draw one series; points arrive oldest first
    fn render(&mut self, series: &TimeSeries) -> Result<()>;
}

/// Draws one horizontal bar per point
#[derive(Debug)]
pub struct TextChart<W: Write> {
    out: W,
    width: usize,
}

impl<W: Write> TextChart<W> {
    /// Text chart writing to `out` with bars up to 40 columns wide
    pub fn new(out: W) -> Self {
        Self { out, width: 40 }
    }

    /// Set the maximum bar width
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    /// Consume the chart and return the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn bar(&self, value: f64, scale: f64) -> String {
        let len = if scale > 0.0 {
            ((value.abs() / scale) * self.width as f64).round() as usize
        } else {
            0
        };
        let glyph = if value < 0.0 { '-' } else { '#' };
        std::iter::repeat_n(glyph, len).collect()
    }
}

impl<W: Write> ChartSink for TextChart<W> {
    fn render(&mut self, series: &TimeSeries) -> Result<()> {
        writeln!(self.out, "{}", series.label)?;
        if series.is_empty() {
            writeln!(self.out, "  (no data)")?;
            return Ok(());
        }

        let scale = series
            .points
            .iter()
            .map(|(_, v)| v.abs())
            .fold(0.0_f64, f64::max);

        for (date, value) in &series.points {
            let bar = self.bar(*value, scale);
            writeln!(self.out, "  {date} {bar:<width$} {value}", width = self.width)?;
        }
        Ok(())
    }
}

/// Keeps every series it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub series: Vec<TimeSeries>,
}

impl ChartSink for RecordingSink {
    fn render(&mut self, series: &TimeSeries) -> Result<()> {
        self.series.push(series.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FundamentalsRecord;
    use crate::fundamentals::{Frequency, StatementKind};
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn income_statement() -> StatementTable {
        let record = FundamentalsRecord {
            financials: Some(json!({
                "Income_Statement": {"quarterly": {
                    "2023-06-30": {"totalRevenue": "200"},
                    "2022-12-31": {"totalRevenue": "100"},
                    "2023-03-31": {"totalRevenue": null}
                }}
            })),
            ..FundamentalsRecord::default()
        };
        StatementTable::from_record(
            &"ACME.US".parse().unwrap(),
            &record,
            StatementKind::IncomeStatement,
            Frequency::Quarterly,
        )
        .unwrap()
    }

    #[test]
    fn test_series_is_chronological() {
        let series = TimeSeries::new(
            "x",
            vec![(date(2023, 6, 30), 2.0), (date(2022, 12, 31), 1.0)],
        );
        assert_eq!(series.points()[0].0, date(2022, 12, 31));
    }

    #[test]
    fn test_series_from_statement_drops_gaps() {
        let series = TimeSeries::from_statement(&income_statement(), "totalRevenue");
        assert_eq!(series.label, "ACME.US totalRevenue");
        assert_eq!(
            series.points(),
            &[(date(2022, 12, 31), 100.0), (date(2023, 6, 30), 200.0)]
        );
    }

    #[test]
    fn test_text_chart() {
        let series = TimeSeries::from_statement(&income_statement(), "totalRevenue");
        let mut chart = TextChart::new(Vec::new()).with_width(10);
        chart.render(&series).unwrap();

        let out = String::from_utf8(chart.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "ACME.US totalRevenue");
        assert_eq!(lines[1], "  2022-12-31 #####      100");
        assert_eq!(lines[2], "  2023-06-30 ########## 200");
    }

    #[test]
    fn test_text_chart_empty_series() {
        let mut chart = TextChart::new(Vec::new());
        chart.render(&TimeSeries::new("empty", Vec::new())).unwrap();
        let out = String::from_utf8(chart.into_inner()).unwrap();
        assert!(out.contains("(no data)"));
    }

    #[test]
    fn test_recording_sink() {
        let mut sink = RecordingSink::default();
        sink.render(&TimeSeries::from_statement(&income_statement(), "totalRevenue"))
            .unwrap();
        assert_eq!(sink.series.len(), 1);
        assert_eq!(sink.series[0].len(), 2);
    }
}

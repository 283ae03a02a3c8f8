//! Index constituents list as an offline source of competitors
//!
//! The list is a CSV export of an index membership table with at least the
//! columns `Ticker symbol` and `GICS Sector`. Spreadsheet workbooks (`.xlsx`)
//! are not read directly; save the sheet as CSV first.

use crate::error::{PeerError, Result};
use crate::ticker::Ticker;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(rename = "Ticker symbol")]
    ticker: String,
    #[serde(rename = "GICS Sector")]
    sector: String,
    #[serde(rename = "Security", default)]
    name: Option<String>,
}

/// One index member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constituent {
    pub ticker: Ticker,
    pub sector: String,
    pub name: Option<String>,
}

/// Members of a stock index with their sectors
#[derive(Debug, Clone, Default)]
pub struct ConstituentsList {
    members: Vec<Constituent>,
}

impl ConstituentsList {
    /// Load from a CSV file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        let list = Self::from_csv(reader)?;
        debug!(path = %path.display(), members = list.len(), "Constituents loaded");
        Ok(list)
    }

    /// Load from any CSV source
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_csv(ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut members = Vec::new();
        for row in reader.deserialize::<Row>() {
            let row = row?;
            if row.ticker.is_empty() {
                continue;
            }
            members.push(Constituent {
                ticker: row.ticker.parse()?,
                sector: row.sector,
                name: row.name.filter(|n| !n.is_empty()),
            });
        }
        Ok(Self { members })
    }

    /// Every member of `sector`, in list order
    pub fn competitors(&self, sector: &str) -> Vec<Ticker> {
        self.members
            .iter()
            .filter(|m| m.sector.eq_ignore_ascii_case(sector.trim()))
            .map(|m| m.ticker.clone())
            .collect()
    }

    /// Sector of `ticker`, matched on the code
    pub fn sector_of(&self, ticker: &Ticker) -> Option<&str> {
        self.find(ticker).map(|m| m.sector.as_str())
    }

    /// Members sharing the sector of `ticker`, `ticker` itself left out
    pub fn peers_of(&self, ticker: &Ticker) -> Result<Vec<Ticker>> {
        let sector = self
            .sector_of(ticker)
            .ok_or_else(|| PeerError::NotFound(format!("{ticker} is not in the constituents list")))?;
        Ok(self
            .competitors(sector)
            .into_iter()
            .filter(|t| t.code() != ticker.code())
            .collect())
    }

    /// Distinct sectors
    pub fn sectors(&self) -> BTreeSet<&str> {
        self.members.iter().map(|m| m.sector.as_str()).collect()
    }

    fn find(&self, ticker: &Ticker) -> Option<&Constituent> {
        self.members.iter().find(|m| m.ticker.code() == ticker.code())
    }

    pub fn members(&self) -> &[Constituent] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CSV: &str = "\
Ticker symbol,Security,GICS Sector,GICS Sub-Industry
BCOR,Blucora,Financials,Investment Banking & Brokerage
BSIG,BrightSphere,Financials,Asset Management & Custody Banks
AAON,AAON Inc,Industrials,Building Products
RILY, B. Riley Financial ,Financials,Investment Banking & Brokerage
";

    fn codes(tickers: &[Ticker]) -> Vec<&str> {
        tickers.iter().map(Ticker::code).collect()
    }

    #[test]
    fn test_competitors_by_sector() {
        let list = ConstituentsList::from_reader(CSV.as_bytes()).unwrap();

        assert_eq!(list.len(), 4);
        assert_eq!(codes(&list.competitors("Financials")), vec!["BCOR", "BSIG", "RILY"]);
        assert_eq!(codes(&list.competitors("financials")), vec!["BCOR", "BSIG", "RILY"]);
        assert!(list.competitors("Energy").is_empty());
        assert_eq!(list.members()[3].name.as_deref(), Some("B. Riley Financial"));
    }

    #[test]
    fn test_sector_and_peers_of() {
        let list = ConstituentsList::from_reader(CSV.as_bytes()).unwrap();
        let bcor: Ticker = "BCOR.US".parse().unwrap();

        assert_eq!(list.sector_of(&bcor), Some("Financials"));
        assert_eq!(codes(&list.peers_of(&bcor).unwrap()), vec!["BSIG", "RILY"]);
        assert!(matches!(
            list.peers_of(&"ZZZ".parse().unwrap()),
            Err(PeerError::NotFound(_))
        ));
        assert_eq!(list.sectors().len(), 2);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let err = ConstituentsList::from_reader("Symbol,Sector\nA,Energy\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PeerError::CsvError(_)));
    }

    #[test]
    fn test_from_path() {
        let path = std::env::temp_dir().join(format!("peerscope-constituents-{}.csv", std::process::id()));
        std::fs::File::create(&path)
            .and_then(|mut f| f.write_all(CSV.as_bytes()))
            .unwrap();

        let list = ConstituentsList::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(list.len(), 4);
    }
}

//! Command handlers

use crate::ResolveArgs;
use anyhow::{Context, Result};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use peerscope::fundamentals::fetch_statement;
use peerscope::{
    ChartSink, ConstituentsList, DecisionProvider, EodClient, FetchReport, FixedDecider, Frequency,
    Highlights, InteractiveDecider, PeerConfig, PeerGroup, PeerGroupResolver, StatementKind,
    StatementTable, TextChart, Ticker, TimeSeries, group_average, market_overview,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

fn client(config: &PeerConfig) -> Result<Arc<EodClient>> {
    let client = EodClient::new(config).context("failed to create EOD Historical Data client")?;
    Ok(Arc::new(client))
}

fn decider(resolve: &ResolveArgs) -> Arc<dyn DecisionProvider> {
    if resolve.non_interactive {
        Arc::new(FixedDecider::new(resolve.keep.into()))
    } else {
        Arc::new(InteractiveDecider::new())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v}"))
}

fn report_skipped(report: &FetchReport) {
    if !report.is_complete() {
        let skipped: Vec<String> = report.skipped.iter().map(ToString::to_string).collect();
        warn!(skipped = %skipped.join(", "), "{}", report);
    }
    eprintln!("{report}");
}

async fn resolve_group(
    client: Arc<EodClient>,
    config: &PeerConfig,
    resolve: &ResolveArgs,
    seed: &str,
) -> Result<PeerGroup> {
    let resolver = PeerGroupResolver::new(client, decider(resolve), config);
    let group = resolver
        .resolve(seed)
        .await
        .with_context(|| format!("failed to resolve the peer group of {seed}"))?;

    for warning in &group.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(group)
}

/// `peers`: resolve and print a peer group
pub async fn peers(config: &PeerConfig, resolve: &ResolveArgs, seed: &str, json: bool) -> Result<()> {
    let group = resolve_group(client(config)?, config, resolve, seed).await?;

    if json {
        return print_json(&group);
    }

    println!(
        "{} peers of {} in \"{}\" (industry from {}):",
        group.len(),
        group.seed,
        group.industry,
        group.source_exchange
    );
    for peer in &group.peers {
        println!("  {peer}");
    }
    if !group.excluded.is_empty() {
        let excluded: Vec<String> = group.excluded.iter().map(ToString::to_string).collect();
        println!("excluded as duplicates: {}", excluded.join(", "));
    }
    Ok(())
}

fn statement_table(statement: &StatementTable, periods: usize) -> Table {
    let skip = statement.len().saturating_sub(periods);
    let shown: Vec<_> = statement.periods().skip(skip).collect();

    let mut table = new_table();
    let mut header = vec![format!("{} {}", statement.ticker, statement.kind)];
    header.extend(shown.iter().map(|p| p.date.to_string()));
    table.set_header(header);

    for field in statement.field_names() {
        let mut row = vec![field.to_string()];
        row.extend(shown.iter().map(|p| format_value(p.value(field))));
        table.add_row(row);
    }
    table
}

/// `statement`: print the most recent periods of a statement per ticker
pub async fn statement(
    config: &PeerConfig,
    tickers: &[Ticker],
    kind: StatementKind,
    frequency: Frequency,
    periods: usize,
    json: bool,
) -> Result<()> {
    let client = client(config)?;
    let batch = peerscope::statements(client.as_ref(), tickers, kind, frequency).await?;

    if json {
        print_json(&batch)?;
    } else {
        for statement in &batch.items {
            println!("{}", statement_table(statement, periods));
        }
    }
    report_skipped(&batch.report);
    Ok(())
}

fn highlights_table(items: &[Highlights]) -> Table {
    let metrics: BTreeSet<&str> = items
        .iter()
        .flat_map(|h| h.metrics().map(|(name, _)| name))
        .collect();

    let mut table = new_table();
    let mut header = vec!["Metric".to_string()];
    header.extend(items.iter().map(|h| h.ticker.to_string()));
    table.set_header(header);

    for metric in metrics {
        let mut row = vec![metric.to_string()];
        row.extend(items.iter().map(|h| format_value(h.get(metric))));
        table.add_row(row);
    }
    table
}

/// `highlights`: print the headline KPIs of every ticker
pub async fn highlights(config: &PeerConfig, tickers: &[Ticker], json: bool) -> Result<()> {
    let client = client(config)?;
    let batch = peerscope::highlights(client.as_ref(), tickers).await?;

    if json {
        print_json(&batch)?;
    } else if !batch.items.is_empty() {
        println!("{}", highlights_table(&batch.items));
    }
    report_skipped(&batch.report);
    Ok(())
}

/// `compare`: focal ticker against the average of the given or resolved peers
pub async fn compare(
    config: &PeerConfig,
    resolve: &ResolveArgs,
    focal: &Ticker,
    peers: Option<&[Ticker]>,
    json: bool,
) -> Result<()> {
    let client = client(config)?;
    let (focal, peers) = match peers {
        Some(peers) => (focal.clone(), peers.to_vec()),
        None => {
            let group =
                resolve_group(Arc::clone(&client), config, resolve, &focal.to_string()).await?;
            let focal = if focal.exchange().is_some() {
                focal.clone()
            } else {
                focal.with_exchange(group.source_exchange)
            };
            (focal, group.peers.into_iter().collect())
        }
    };

    let mut tickers = vec![focal.clone()];
    tickers.extend(peers.into_iter().filter(|t| *t != focal));
    info!(%focal, group = tickers.len(), "Comparing");

    let (overview, report) = market_overview(client.as_ref(), &tickers).await?;
    let comparison = group_average(&overview, &focal)
        .with_context(|| format!("no highlights available for {focal}"))?;

    if json {
        #[derive(Serialize)]
        struct Output<'a> {
            overview: &'a peerscope::MarketOverview,
            comparison: &'a peerscope::GroupComparison,
            report: &'a FetchReport,
        }
        print_json(&Output {
            overview: &overview,
            comparison: &comparison,
            report: &report,
        })?;
    } else {
        println!("{}", overview.to_table());
        println!("{}", comparison.to_table());
    }
    report_skipped(&report);
    Ok(())
}

/// `chart`: draw one line item of a statement as text bars
pub async fn chart(
    config: &PeerConfig,
    ticker: &Ticker,
    field: &str,
    kind: StatementKind,
    frequency: Frequency,
    width: usize,
) -> Result<()> {
    let client = client(config)?;
    let statement = fetch_statement(client.as_ref(), ticker, kind, frequency).await?;

    if !statement.field_names().contains(field) {
        anyhow::bail!("{ticker} {kind} has no line item '{field}'");
    }

    let series = TimeSeries::from_statement(&statement, field);
    let mut sink = TextChart::new(std::io::stdout().lock()).with_width(width);
    sink.render(&series)?;
    Ok(())
}

/// `constituents`: competitors by sector from an index constituents file
pub fn constituents(
    file: &Path,
    sector: Option<&str>,
    ticker: Option<&Ticker>,
    json: bool,
) -> Result<()> {
    let list = ConstituentsList::from_path(file)
        .with_context(|| format!("failed to read constituents from {}", file.display()))?;

    let competitors = match (sector, ticker) {
        (Some(sector), _) => list.competitors(sector),
        (None, Some(ticker)) => list.peers_of(ticker)?,
        (None, None) => anyhow::bail!("either --sector or --ticker is required"),
    };

    if json {
        return print_json(&competitors);
    }
    for competitor in &competitors {
        println!("{competitor}");
    }
    if competitors.is_empty() {
        eprintln!("no matching constituents (sectors: {:?})", list.sectors());
    }
    Ok(())
}

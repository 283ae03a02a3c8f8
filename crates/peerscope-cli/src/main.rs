//! Command-line interface for peerscope

mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use peerscope::{Decision, Exchange, Frequency, NamePolicy, PeerConfig, StatementKind, Ticker};
use peerscope_utils::{LogConfig, LogFormat};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "peerscope", version)]
#[command(about = "Industry peer groups and fundamentals comparisons", long_about = None)]
struct Cli {
    /// EOD Historical Data API key (falls back to API_EOD)
    #[arg(long, global = true, env = "EOD_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging for the peerscope crates
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogStyle::Pretty)]
    log_format: LogStyle,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the industry peer group of a ticker
    Peers {
        /// Seed ticker, with or without market suffix
        seed: String,
        #[command(flatten)]
        resolve: ResolveArgs,
    },
    /// Show a financial statement for one or more tickers
    Statement {
        #[arg(required = true)]
        tickers: Vec<Ticker>,
        /// Balance_Sheet, Income_Statement or Cash_Flow
        #[arg(long, default_value = "Balance_Sheet")]
        kind: StatementKind,
        /// quarterly or yearly
        #[arg(long, default_value = "quarterly")]
        frequency: Frequency,
        /// Most recent periods shown
        #[arg(long, default_value_t = 4)]
        periods: usize,
    },
    /// Show headline KPIs for one or more tickers
    Highlights {
        #[arg(required = true)]
        tickers: Vec<Ticker>,
    },
    /// Compare a ticker with the average of its peers
    Compare {
        /// Ticker to compare
        focal: Ticker,
        /// Peers to average over
        peers: Vec<Ticker>,
        /// Resolve the peers from the screener instead
        #[arg(long, conflicts_with = "peers")]
        auto_peers: bool,
        #[command(flatten)]
        resolve: ResolveArgs,
    },
    /// Chart one statement line item over time
    Chart {
        ticker: Ticker,
        /// Line item, e.g. totalRevenue
        field: String,
        #[arg(long, default_value = "Income_Statement")]
        kind: StatementKind,
        #[arg(long, default_value = "quarterly")]
        frequency: Frequency,
        /// Maximum bar width
        #[arg(long, default_value_t = 40)]
        width: usize,
    },
    /// Competitors from an index constituents CSV
    Constituents {
        /// CSV with "Ticker symbol" and "GICS Sector" columns (export .xlsx lists to CSV first)
        file: PathBuf,
        /// List every member of this sector
        #[arg(long, conflicts_with = "ticker", required_unless_present = "ticker")]
        sector: Option<String>,
        /// List the members sharing this ticker's sector
        #[arg(long)]
        ticker: Option<Ticker>,
    },
}

/// Options of a peer-group resolution
#[derive(Args, Debug, Clone)]
struct ResolveArgs {
    /// Exchanges searched, in priority order
    #[arg(long, value_delimiter = ',', default_values_t = Exchange::defaults())]
    exchanges: Vec<Exchange>,

    /// Maximum screener results per exchange
    #[arg(long, default_value_t = 50)]
    limit: u32,

    /// How company names are compared
    #[arg(long, value_enum, default_value_t = PolicyArg::Exact)]
    policy: PolicyArg,

    /// Fuzzy policy: scores at or below are different companies
    #[arg(long, default_value_t = 0.8)]
    lower: f64,

    /// Fuzzy policy: scores at or above are the same name
    #[arg(long, default_value_t = 1.0)]
    upper: f64,

    /// Never prompt; apply --keep to every near-duplicate pair
    #[arg(long)]
    non_interactive: bool,

    /// Outcome applied without prompting
    #[arg(long, value_enum, default_value_t = KeepArg::Neither, requires = "non_interactive")]
    keep: KeepArg,
}

impl ResolveArgs {
    fn name_policy(&self) -> NamePolicy {
        match self.policy {
            PolicyArg::Exact => NamePolicy::Exact,
            PolicyArg::Fuzzy => NamePolicy::Fuzzy {
                lower: self.lower,
                upper: self.upper,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KeepArg {
    First,
    Second,
    Neither,
}

impl From<KeepArg> for Decision {
    fn from(keep: KeepArg) -> Self {
        match keep {
            KeepArg::First => Decision::KeepFirst,
            KeepArg::Second => Decision::KeepSecond,
            KeepArg::Neither => Decision::KeepNeither,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogStyle {
    Pretty,
    Json,
}

impl From<LogStyle> for LogFormat {
    fn from(style: LogStyle) -> Self {
        match style {
            LogStyle::Pretty => LogFormat::Pretty,
            LogStyle::Json => LogFormat::Json,
        }
    }
}

impl Cli {
    /// Client configuration from the global flags and, if given, resolution options
    fn config(&self, resolve: Option<&ResolveArgs>) -> peerscope::Result<PeerConfig> {
        let mut builder = PeerConfig::builder()
            .with_env_api_key()
            .request_timeout(Duration::from_secs(self.timeout_secs));

        if let Some(key) = &self.api_key {
            builder = builder.api_key(key.clone());
        }
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url.clone());
        }
        if let Some(resolve) = resolve {
            builder = builder
                .exchanges(resolve.exchanges.clone())
                .limit(resolve.limit)
                .name_policy(resolve.name_policy());
        }

        builder.build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    peerscope_utils::init_tracing_with(
        &LogConfig::default()
            .verbose(cli.verbose)
            .format(cli.log_format.into()),
    );

    debug!(command = ?cli.command, "Starting peerscope");

    match &cli.command {
        Command::Peers { seed, resolve } => {
            commands::peers(&cli.config(Some(resolve))?, resolve, seed, cli.json).await
        }
        Command::Statement {
            tickers,
            kind,
            frequency,
            periods,
        } => {
            commands::statement(&cli.config(None)?, tickers, *kind, *frequency, *periods, cli.json)
                .await
        }
        Command::Highlights { tickers } => {
            commands::highlights(&cli.config(None)?, tickers, cli.json).await
        }
        Command::Compare {
            focal,
            peers,
            auto_peers,
            resolve,
        } => {
            let config = cli.config(Some(resolve))?;
            let peers = if *auto_peers { None } else { Some(peers.as_slice()) };
            commands::compare(&config, resolve, focal, peers, cli.json).await
        }
        Command::Chart {
            ticker,
            field,
            kind,
            frequency,
            width,
        } => commands::chart(&cli.config(None)?, ticker, field, *kind, *frequency, *width).await,
        Command::Constituents {
            file,
            sector,
            ticker,
        } => commands::constituents(file, sector.as_deref(), ticker.as_ref(), cli.json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_peers() {
        let cli = Cli::try_parse_from([
            "peerscope",
            "peers",
            "SAP.XETRA",
            "--exchanges",
            "xetra,us",
            "--policy",
            "fuzzy",
            "--non-interactive",
            "--keep",
            "first",
        ])
        .unwrap();

        let Command::Peers { seed, resolve } = cli.command else {
            panic!("expected peers command");
        };
        assert_eq!(seed, "SAP.XETRA");
        assert_eq!(resolve.exchanges, vec![Exchange::Xetra, Exchange::Us]);
        assert_eq!(resolve.name_policy(), NamePolicy::fuzzy());
        assert_eq!(Decision::from(resolve.keep), Decision::KeepFirst);
    }

    #[test]
    fn test_parse_statement_defaults() {
        let cli = Cli::try_parse_from(["peerscope", "statement", "AAPL.US", "MSFT.US"]).unwrap();
        let Command::Statement {
            tickers,
            kind,
            frequency,
            periods,
        } = cli.command
        else {
            panic!("expected statement command");
        };
        assert_eq!(tickers.len(), 2);
        assert_eq!(kind, StatementKind::BalanceSheet);
        assert_eq!(frequency, Frequency::Quarterly);
        assert_eq!(periods, 4);
    }

    #[test]
    fn test_auto_peers_conflicts_with_explicit_peers() {
        assert!(
            Cli::try_parse_from(["peerscope", "compare", "BCOR.US", "RILY.US", "--auto-peers"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["peerscope", "compare", "BCOR.US", "--auto-peers"]).is_ok());
    }

    #[test]
    fn test_resolve_options_reach_config() {
        let cli = Cli::try_parse_from([
            "peerscope",
            "--api-key",
            "k",
            "peers",
            "SAP",
            "--limit",
            "5",
        ])
        .unwrap();
        let Command::Peers { resolve, .. } = &cli.command else {
            panic!("expected peers command");
        };

        let config = cli.config(Some(resolve)).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.limit, 5);
        assert_eq!(config.exchanges, Exchange::defaults());
    }
}

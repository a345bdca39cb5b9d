//! CLI argument definitions for tickerlens.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dashboard` | Bars, summary metrics and moving averages for one symbol |
//! | `fundamentals` | Revenue, market capitalization and P/E |
//! | `watchlist` | Intraday change for a list of symbols |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--source` | `yahoo` | Data source (yahoo, csv) |
//! | `--data-dir` | `data` | Directory read by the csv source |
//! | `--tz` | `US/Eastern` | Display time zone |
//! | `--timeout-ms` | none | HTTP timeout, `0` disables it |
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat reported issues as failures |
//! | `-v` | warn | Log verbosity on stderr, repeatable |
//!
//! # Examples
//!
//! ```bash
//! tickerlens dashboard AAPL --period 1mo --indicator sma --indicator ema
//! tickerlens --source csv --data-dir ./fixtures dashboard ADBE --period 1y
//! tickerlens --format table watchlist NVDA TSLA
//! ```

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

/// Stock dashboard in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tickerlens",
    author,
    version,
    about = "Stock dashboard: prices, moving averages and fundamentals",
    long_about = "tickerlens fetches OHLCV history for a ticker, converts it to the market's \
time zone and derives summary metrics and moving averages. Fundamentals and a small \
watch list are available as separate commands.\n\
\n\
Environment: TICKERLENS_TZ, TICKERLENS_INDICATOR_WINDOW, TICKERLENS_WATCHLIST, \
TICKERLENS_HTTP_TIMEOUT_MS and YAHOO_COOKIE. Flags win over the environment."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Exit with code 5 when the output carries warnings or errors.
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Data source for bars and fundamentals.
    #[arg(long, global = true, value_enum, default_value_t = SourceSelector::Yahoo)]
    pub source: SourceSelector,

    /// Directory holding `<SYMBOL>.csv` files and `fundamentals.json`.
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,

    /// IANA time zone bars are shown in (e.g. US/Eastern, Europe/London).
    #[arg(long, global = true)]
    pub tz: Option<String>,

    /// HTTP timeout in milliseconds; 0 waits indefinitely.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text tables for terminal display.
    Table,
    /// Single JSON envelope.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceSelector {
    /// Yahoo Finance chart and quoteSummary endpoints.
    Yahoo,
    /// Local CSV exports.
    Csv,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch bars for a symbol and derive metrics and indicators.
    ///
    /// # Examples
    ///
    ///   tickerlens dashboard AAPL
    ///   tickerlens dashboard MSFT --period 1y --indicator sma --window 50
    ///   tickerlens dashboard ^GSPC --period 1d --interval 30m
    Dashboard(DashboardArgs),

    /// Fetch revenue, market capitalization and P/E.
    ///
    /// # Examples
    ///
    ///   tickerlens fundamentals AAPL
    ///   tickerlens fundamentals AAPL MSFT --pretty
    Fundamentals(FundamentalsArgs),

    /// Intraday change for each watched symbol.
    ///
    /// Without symbols the configured watch list is used.
    Watchlist(WatchlistArgs),
}

#[derive(Debug, Args)]
pub struct DashboardArgs {
    /// Market symbol (e.g. AAPL, BRK.B, ^GSPC).
    pub symbol: String,

    /// Time period: 1d, 1wk, 1mo, 1y or max.
    #[arg(long, default_value = "1mo")]
    pub period: String,

    /// Bar interval (1m, 30m, 1d, 1wk); defaults from the period.
    #[arg(long)]
    pub interval: Option<String>,

    /// Moving average to overlay (sma, ema); repeatable.
    #[arg(long = "indicator")]
    pub indicators: Vec<String>,

    /// Moving average window in bars.
    #[arg(long)]
    pub window: Option<usize>,
}

#[derive(Debug, Args)]
pub struct FundamentalsArgs {
    /// One or more market symbols.
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Args)]
pub struct WatchlistArgs {
    /// Symbols to watch; falls back to the configured list.
    pub symbols: Vec<String>,
}

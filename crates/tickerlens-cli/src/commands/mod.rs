mod dashboard;
mod fundamentals;
mod watchlist;

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tickerlens_core::{
    CsvSource, Dashboard, DashboardConfig, DataSource, Envelope, EnvelopeError, EnvelopeMeta,
    MarketZone, ProviderId, ReportIssue, ReportStatus, ReqwestHttpClient, Symbol, YahooSource,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cli::{Cli, Command, SourceSelector};
use crate::error::CliError;
use crate::output::{CommandOutput, TableBlock};

/// Per-command payload before it is wrapped in an envelope.
pub struct CommandResult {
    pub data: Value,
    pub blocks: Vec<TableBlock>,
    pub warnings: Vec<String>,
    pub issues: Vec<(Symbol, Vec<ReportIssue>)>,
    pub rejected: Vec<RejectedSymbol>,
}

/// User input that is not a symbol; shown as `unavailable` next to the
/// symbols that did parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedSymbol {
    pub input: String,
    pub status: ReportStatus,
    pub issues: Vec<ReportIssue>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            blocks: Vec::new(),
            warnings: Vec::new(),
            issues: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn with_block(mut self, block: TableBlock) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_issues(mut self, symbol: Symbol, issues: Vec<ReportIssue>) -> Self {
        if !issues.is_empty() {
            self.issues.push((symbol, issues));
        }
        self
    }

    pub fn with_rejected(mut self, rejected: Vec<RejectedSymbol>) -> Self {
        self.rejected.extend(rejected);
        self
    }
}

pub fn run(cli: &Cli) -> Result<CommandOutput, CliError> {
    let config = load_config(cli)?;
    let dashboard = Dashboard::from_config(build_source(cli, &config)?, &config);
    info!(source = %dashboard.source_id(), zone = %config.zone(), "dashboard ready");

    let started = Instant::now();
    let result = match &cli.command {
        Command::Dashboard(args) => dashboard::run(args, &dashboard, &config)?,
        Command::Fundamentals(args) => fundamentals::run(args, &dashboard)?,
        Command::Watchlist(args) => watchlist::run(args, &dashboard, &config)?,
    };
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    wrap(result, dashboard.source_id(), latency_ms)
}

fn wrap(
    result: CommandResult,
    source: ProviderId,
    latency_ms: u64,
) -> Result<CommandOutput, CliError> {
    let CommandResult {
        data,
        blocks,
        warnings,
        issues,
        rejected,
    } = result;

    let mut meta = EnvelopeMeta::new(Uuid::new_v4().to_string(), source, latency_ms)?;
    for warning in warnings {
        meta.push_warning(warning);
    }

    let mut envelope = Envelope::new(meta, data);
    for (symbol, issues) in &issues {
        envelope.extend_issues(symbol, issues)?;
    }
    for issue in rejected.iter().flat_map(|rejected| &rejected.issues) {
        envelope.push_error(
            EnvelopeError::new(issue.code.clone(), issue.message.clone())?
                .with_retryable(issue.retryable),
        )?;
    }

    Ok(CommandOutput { envelope, blocks })
}

/// Defaults, then `TICKERLENS_*` variables, then flags.
fn load_config(cli: &Cli) -> Result<DashboardConfig, CliError> {
    let mut config = DashboardConfig::from_env()?;

    if let Some(tz) = &cli.tz {
        config = config.with_zone(MarketZone::parse(tz)?);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_http_timeout_ms((timeout_ms > 0).then_some(timeout_ms));
    }

    Ok(config)
}

fn build_source(cli: &Cli, config: &DashboardConfig) -> Result<Arc<dyn DataSource>, CliError> {
    match cli.source {
        SourceSelector::Yahoo => {
            let http_client = Arc::new(ReqwestHttpClient::new()?);
            Ok(Arc::new(
                YahooSource::new(http_client).with_timeout_ms(config.http_timeout_ms()),
            ))
        }
        SourceSelector::Csv => Ok(Arc::new(CsvSource::new(&cli.data_dir))),
    }
}

/// Parses each user-typed symbol on its own; a bad one never hides the rest.
fn parse_symbols(raw: &[String]) -> (Vec<Symbol>, Vec<RejectedSymbol>) {
    let mut symbols = Vec::with_capacity(raw.len());
    let mut rejected = Vec::new();

    for input in raw {
        match Symbol::parse(input) {
            Ok(symbol) => symbols.push(symbol),
            Err(error) => {
                warn!(input = %input, error = %error, "symbol rejected");
                rejected.push(RejectedSymbol {
                    input: input.clone(),
                    status: ReportStatus::Unavailable,
                    issues: vec![ReportIssue::invalid_symbol(input, &error)],
                });
            }
        }
    }

    (symbols, rejected)
}

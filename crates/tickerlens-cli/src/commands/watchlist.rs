use serde::Serialize;

use tickerlens_core::display::NOT_AVAILABLE;
use tickerlens_core::{Dashboard, DashboardConfig, WatchlistEntry};

use crate::cli::WatchlistArgs;
use crate::error::CliError;
use crate::output::TableBlock;

use super::{parse_symbols, CommandResult, RejectedSymbol};

#[derive(Debug, Serialize)]
struct WatchlistResponseData<'a> {
    watchlist: &'a [WatchlistEntry],
    #[serde(skip_serializing_if = "<[RejectedSymbol]>::is_empty")]
    rejected: &'a [RejectedSymbol],
}

pub fn run(
    args: &WatchlistArgs,
    dashboard: &Dashboard,
    config: &DashboardConfig,
) -> Result<CommandResult, CliError> {
    let (symbols, rejected) = if args.symbols.is_empty() {
        (config.watchlist().to_vec(), Vec::new())
    } else {
        parse_symbols(&args.symbols)
    };

    let entries = dashboard.watchlist(&symbols);
    let mut table = rows(&entries);
    table.extend(rejected.iter().map(|rejected| {
        vec![
            rejected.input.clone(),
            rejected.status.as_str().to_owned(),
            NOT_AVAILABLE.to_owned(),
            NOT_AVAILABLE.to_owned(),
        ]
    }));

    let mut result = CommandResult::ok(serde_json::to_value(WatchlistResponseData {
        watchlist: &entries,
        rejected: &rejected,
    })?)
    .with_block(TableBlock::new("Watchlist", header(), table))
    .with_rejected(rejected);

    for entry in entries {
        result = result.with_issues(entry.symbol, entry.issues);
    }

    Ok(result)
}

fn header() -> Vec<String> {
    ["symbol", "status", "price", "change"]
        .map(String::from)
        .to_vec()
}

fn rows(entries: &[WatchlistEntry]) -> Vec<Vec<String>> {
    entries
        .iter()
        .map(|entry| {
            let (price, change) = match &entry.card {
                Some(card) => (card.value.clone(), card.delta.clone().unwrap_or_default()),
                None => (NOT_AVAILABLE.to_owned(), NOT_AVAILABLE.to_owned()),
            };
            vec![
                entry.symbol.to_string(),
                entry.status.as_str().to_owned(),
                price,
                change,
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tickerlens_core::{
        DataSource, FinancialSnapshot, ProviderId, RawFrame, SeriesRequest, SourceError, Symbol,
    };

    use super::*;

    struct NoTrades;

    impl DataSource for NoTrades {
        fn id(&self) -> ProviderId {
            ProviderId::Csv
        }

        fn fetch_series(&self, _req: &SeriesRequest) -> Result<RawFrame, SourceError> {
            Ok(RawFrame::empty())
        }

        fn fetch_fundamentals(&self, _symbol: &Symbol) -> Result<FinancialSnapshot, SourceError> {
            Ok(FinancialSnapshot::default())
        }
    }

    fn run_with(symbols: &[&str]) -> CommandResult {
        let config = DashboardConfig::default();
        let dashboard = Dashboard::from_config(Arc::new(NoTrades), &config);
        let args = WatchlistArgs {
            symbols: symbols.iter().map(|value| (*value).to_owned()).collect(),
        };
        run(&args, &dashboard, &config).expect("watchlist runs")
    }

    #[test]
    fn mixed_list_keeps_valid_symbols_and_marks_the_bad_one_unavailable() {
        let result = run_with(&["AAPL", "BRK/B", "msft"]);

        let watchlist = result.data["watchlist"].as_array().expect("entries");
        assert_eq!(watchlist.len(), 2);
        assert_eq!(watchlist[0]["symbol"], "AAPL");
        assert_eq!(watchlist[1]["symbol"], "MSFT");

        let rejected = &result.data["rejected"][0];
        assert_eq!(rejected["input"], "BRK/B");
        assert_eq!(rejected["status"], "unavailable");
        assert_eq!(rejected["issues"][0]["code"], "source.invalid_request");

        let block = &result.blocks[0];
        assert_eq!(block.rows.len(), 3);
        assert_eq!(block.rows[2][0], "BRK/B");
        assert_eq!(block.rows[2][1], "unavailable");
        assert_eq!(result.rejected.len(), 1);
    }

    #[test]
    fn clean_list_has_no_rejected_field() {
        let result = run_with(&["AAPL"]);

        assert!(result.data.get("rejected").is_none());
        assert!(result.rejected.is_empty());
    }
}

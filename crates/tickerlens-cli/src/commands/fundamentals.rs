use serde::Serialize;

use tickerlens_core::{Dashboard, FundamentalsReport};

use crate::cli::FundamentalsArgs;
use crate::error::CliError;
use crate::output::TableBlock;

use super::{parse_symbols, CommandResult, RejectedSymbol};

#[derive(Debug, Serialize)]
struct FundamentalsResponseData {
    fundamentals: Vec<FundamentalsReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rejected: Vec<RejectedSymbol>,
}

pub fn run(args: &FundamentalsArgs, dashboard: &Dashboard) -> Result<CommandResult, CliError> {
    let (symbols, rejected) = parse_symbols(&args.symbols);
    let reports: Vec<FundamentalsReport> = symbols
        .iter()
        .map(|symbol| dashboard.fundamentals(symbol))
        .collect();

    let mut result = CommandResult::ok(serde_json::to_value(FundamentalsResponseData {
        fundamentals: reports.clone(),
        rejected: rejected.clone(),
    })?)
    .with_rejected(rejected);

    for report in reports {
        result = result
            .with_block(TableBlock::cards(
                format!("{} fundamentals", report.symbol),
                report.cards.cards(),
            ))
            .with_issues(report.symbol, report.issues);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tickerlens_core::{
        DataSource, FinancialSnapshot, MarketZone, ProviderId, RawFrame, SeriesRequest,
        SourceError, Symbol,
    };

    use super::*;

    struct Unreachable;

    impl DataSource for Unreachable {
        fn id(&self) -> ProviderId {
            ProviderId::Yahoo
        }

        fn fetch_series(&self, _req: &SeriesRequest) -> Result<RawFrame, SourceError> {
            Ok(RawFrame::empty())
        }

        fn fetch_fundamentals(&self, _symbol: &Symbol) -> Result<FinancialSnapshot, SourceError> {
            Err(SourceError::unavailable("connection refused"))
        }
    }

    #[test]
    fn mixed_list_reports_every_input() {
        let dashboard = Dashboard::new(Arc::new(Unreachable), MarketZone::default());
        let args = FundamentalsArgs {
            symbols: vec![String::from("7203.T"), String::from("not a ticker")],
        };

        let result = run(&args, &dashboard).expect("fundamentals run");

        let reports = result.data["fundamentals"].as_array().expect("reports");
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0]["symbol"], "7203.T");
        assert_eq!(reports[0]["issues"][0]["code"], "source.unavailable");

        let rejected = &result.data["rejected"][0];
        assert_eq!(rejected["input"], "not a ticker");
        assert_eq!(rejected["status"], "unavailable");
        assert_eq!(rejected["issues"][0]["code"], "source.invalid_request");
        assert_eq!(rejected["issues"][0]["retryable"], false);
    }
}

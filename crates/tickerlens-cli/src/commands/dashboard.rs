use std::str::FromStr;

use serde::Serialize;
use tickerlens_core::{
    Dashboard, DashboardConfig, DashboardRequest, IndicatorKind, IndicatorSpec, Interval,
    MetricCards, Period, Symbol, SymbolReport,
};

use crate::cli::DashboardArgs;
use crate::error::CliError;
use crate::output::TableBlock;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct DashboardResponseData<'a> {
    report: &'a SymbolReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    cards: Option<MetricCards>,
}

pub fn run(
    args: &DashboardArgs,
    dashboard: &Dashboard,
    config: &DashboardConfig,
) -> Result<CommandResult, CliError> {
    let request = build_request(args, config)?;
    let report = dashboard.report(&request);

    let cards = report.metric_cards();
    let table = report.table().transpose()?;

    let mut result = CommandResult::ok(serde_json::to_value(DashboardResponseData {
        report: &report,
        cards: cards.clone(),
    })?);

    let title = format!(
        "{} {} ({}, {})",
        report.symbol,
        report.period,
        report.interval,
        report.status.as_str()
    );
    if let Some(cards) = &cards {
        result = result.with_block(TableBlock::cards(title.clone(), cards.cards()));
    }
    if let Some(table) = table {
        result = result.with_block(TableBlock::new(
            format!("{title} bars"),
            table.columns().to_vec(),
            table.render_cells(),
        ));
    }

    if args.window.is_some() && args.indicators.is_empty() {
        result = result.with_warning("--window has no effect without --indicator");
    }

    Ok(result.with_issues(report.symbol.clone(), report.issues))
}

fn build_request(args: &DashboardArgs, config: &DashboardConfig) -> Result<DashboardRequest, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let period = Period::from_str(&args.period)?;
    let window = args.window.unwrap_or(config.indicator_window());

    let mut request = DashboardRequest::new(symbol, period);
    if let Some(interval) = &args.interval {
        request = request.with_interval(Interval::from_str(interval)?);
    }
    for indicator in &args.indicators {
        let kind = IndicatorKind::from_str(indicator)?;
        request = request.with_indicator(IndicatorSpec::new(kind, window)?);
    }

    Ok(request)
}

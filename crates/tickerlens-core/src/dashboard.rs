//! One dashboard refresh: fetch → normalize → metrics and indicators.
//!
//! Every failure below this point is recovered into a per-symbol status plus
//! a list of [`ReportIssue`]s, so a front end always has something to show.
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `ready` | Bars, metrics and indicators are present |
//! | `empty` | The source answered with no bars |
//! | `unavailable` | The source failed or its rows were unusable |

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::data_source::{DataSource, SeriesRequest, SourceError};
use crate::display::{Card, MetricCards, SnapshotCards};
use crate::error::NormalizeError;
use crate::indicators::{IndicatorEngine, IndicatorSeries, IndicatorSpec};
use crate::metrics::{SummaryMetrics, WatchlistQuote};
use crate::normalizer::Normalizer;
use crate::table::SeriesTable;
use crate::{
    DashboardConfig, FinancialSnapshot, Interval, MarketZone, Period, ProviderId, Series, Symbol,
    ValidationError,
};

pub const CODE_SERIES_EMPTY: &str = "series.empty";
pub const CODE_SERIES_MALFORMED: &str = "series.malformed";
pub const CODE_MISSING_FIELD: &str = "fundamentals.missing_field";
pub const CODE_UNDEFINED_RATIO: &str = "metrics.undefined_ratio";

/// Everything a front end selects for one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRequest {
    pub symbol: Symbol,
    pub period: Period,
    pub interval: Interval,
    pub indicators: Vec<IndicatorSpec>,
}

impl DashboardRequest {
    /// Interval defaults from the period.
    pub fn new(symbol: Symbol, period: Period) -> Self {
        Self {
            symbol,
            period,
            interval: period.interval(),
            indicators: Vec::new(),
        }
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_indicator(mut self, spec: IndicatorSpec) -> Self {
        self.indicators.push(spec);
        self
    }

    pub fn series_request(&self) -> SeriesRequest {
        SeriesRequest::new(self.symbol.clone(), self.period).with_interval(self.interval)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Ready,
    Empty,
    Unavailable,
}

impl ReportStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Empty => "empty",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Recovered failure or notable condition attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportIssue {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ReportIssue {
    pub fn new(code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }

    pub fn from_source(error: &SourceError) -> Self {
        Self::new(error.code(), error.message(), error.retryable())
    }

    /// User input rejected before any fetch; reported like a refused request.
    pub fn invalid_symbol(input: &str, error: &ValidationError) -> Self {
        Self::from_source(&SourceError::invalid_request(format!(
            "'{input}' is not a valid symbol: {error}"
        )))
    }

    pub fn malformed(error: &NormalizeError) -> Self {
        Self::new(CODE_SERIES_MALFORMED, error.to_string(), false)
    }

    pub fn empty_series(symbol: &Symbol, period: Period) -> Self {
        Self::new(
            CODE_SERIES_EMPTY,
            format!("no bars for {symbol} over {period}"),
            false,
        )
    }

    pub fn missing_field(symbol: &Symbol, field: &str) -> Self {
        Self::new(
            CODE_MISSING_FIELD,
            format!("{field} not reported for {symbol}"),
            false,
        )
    }

    pub fn undefined_ratio(symbol: &Symbol) -> Self {
        Self::new(
            CODE_UNDEFINED_RATIO,
            format!("percent change for {symbol} is undefined: first price is zero"),
            false,
        )
    }
}

/// Result of one dashboard refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolReport {
    pub symbol: Symbol,
    pub period: Period,
    pub interval: Interval,
    pub status: ReportStatus,
    pub series: Option<Series>,
    pub metrics: Option<SummaryMetrics>,
    pub indicators: Vec<IndicatorSeries>,
    pub issues: Vec<ReportIssue>,
}

impl SymbolReport {
    fn unavailable(request: &DashboardRequest, issue: ReportIssue) -> Self {
        Self {
            symbol: request.symbol.clone(),
            period: request.period,
            interval: request.interval,
            status: ReportStatus::Unavailable,
            series: None,
            metrics: None,
            indicators: Vec::new(),
            issues: vec![issue],
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ReportStatus::Ready
    }

    pub fn metric_cards(&self) -> Option<MetricCards> {
        self.metrics
            .as_ref()
            .map(|metrics| MetricCards::new(&self.symbol, metrics))
    }

    /// Bars plus indicator columns; `None` without a series.
    pub fn table(&self) -> Option<Result<SeriesTable, ValidationError>> {
        self.series
            .as_ref()
            .map(|series| SeriesTable::build(series, &self.indicators))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundamentalsReport {
    pub symbol: Symbol,
    pub snapshot: FinancialSnapshot,
    pub cards: SnapshotCards,
    pub issues: Vec<ReportIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchlistEntry {
    pub symbol: Symbol,
    pub status: ReportStatus,
    pub quote: Option<WatchlistQuote>,
    pub card: Option<Card>,
    pub issues: Vec<ReportIssue>,
}

/// Runs refreshes against one data source.
#[derive(Clone)]
pub struct Dashboard {
    source: Arc<dyn DataSource>,
    normalizer: Normalizer,
    engine: IndicatorEngine,
}

impl Dashboard {
    pub fn new(source: Arc<dyn DataSource>, zone: MarketZone) -> Self {
        Self {
            source,
            normalizer: Normalizer::new(zone),
            engine: IndicatorEngine,
        }
    }

    pub fn from_config(source: Arc<dyn DataSource>, config: &DashboardConfig) -> Self {
        Self::new(source, config.zone())
    }

    pub fn source_id(&self) -> ProviderId {
        self.source.id()
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Fetches and normalizes bars, mapping failures to issues.
    fn load_series(&self, request: &SeriesRequest) -> Result<Series, ReportIssue> {
        let frame = self.source.fetch_series(request).map_err(|error| {
            warn!(
                source = %self.source.id(),
                symbol = %request.symbol,
                code = error.code(),
                error = %error,
                "series fetch failed"
            );
            ReportIssue::from_source(&error)
        })?;

        self.normalizer.normalize(request, &frame).map_err(|error| {
            warn!(symbol = %request.symbol, error = %error, "raw frame rejected");
            ReportIssue::malformed(&error)
        })
    }

    pub fn report(&self, request: &DashboardRequest) -> SymbolReport {
        let series = match self.load_series(&request.series_request()) {
            Ok(series) => series,
            Err(issue) => return SymbolReport::unavailable(request, issue),
        };

        let mut report = SymbolReport {
            symbol: request.symbol.clone(),
            period: request.period,
            interval: request.interval,
            status: ReportStatus::Empty,
            series: None,
            metrics: None,
            indicators: Vec::new(),
            issues: Vec::new(),
        };

        // Both derivations reject only an empty series.
        let (Ok(metrics), Ok(indicators)) = (
            SummaryMetrics::compute(&series),
            self.engine.compute(&series, &request.indicators),
        ) else {
            debug!(symbol = %request.symbol, period = %request.period, "series is empty");
            report
                .issues
                .push(ReportIssue::empty_series(&request.symbol, request.period));
            report.series = Some(series);
            return report;
        };

        if !metrics.ratio_defined() {
            report
                .issues
                .push(ReportIssue::undefined_ratio(&request.symbol));
        }

        debug!(
            symbol = %request.symbol,
            bars = series.len(),
            indicators = indicators.len(),
            "dashboard report ready"
        );
        report.status = ReportStatus::Ready;
        report.series = Some(series);
        report.metrics = Some(metrics);
        report.indicators = indicators;
        report
    }

    /// Source failure degrades to an all-absent snapshot; each absent field is
    /// reported as an issue.
    pub fn fundamentals(&self, symbol: &Symbol) -> FundamentalsReport {
        let mut issues = Vec::new();
        let snapshot = match self.source.fetch_fundamentals(symbol) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(
                    source = %self.source.id(),
                    symbol = %symbol,
                    code = error.code(),
                    error = %error,
                    "fundamentals fetch failed"
                );
                issues.push(ReportIssue::from_source(&error));
                FinancialSnapshot::unavailable()
            }
        };

        issues.extend(
            snapshot
                .missing_fields()
                .into_iter()
                .map(|field| ReportIssue::missing_field(symbol, field)),
        );

        FundamentalsReport {
            symbol: symbol.clone(),
            cards: SnapshotCards::new(&snapshot),
            snapshot,
            issues,
        }
    }

    /// Intraday (`1d`) quote per symbol, fetched one after another. A failing
    /// symbol only affects its own entry.
    pub fn watchlist(&self, symbols: &[Symbol]) -> Vec<WatchlistEntry> {
        symbols
            .iter()
            .map(|symbol| self.watchlist_entry(symbol))
            .collect()
    }

    fn watchlist_entry(&self, symbol: &Symbol) -> WatchlistEntry {
        let mut entry = WatchlistEntry {
            symbol: symbol.clone(),
            status: ReportStatus::Unavailable,
            quote: None,
            card: None,
            issues: Vec::new(),
        };

        let series = match self.load_series(&SeriesRequest::new(symbol.clone(), Period::OneDay)) {
            Ok(series) => series,
            Err(issue) => {
                entry.issues.push(issue);
                return entry;
            }
        };

        match WatchlistQuote::from_series(&series) {
            Ok(quote) => {
                if quote.percent_change.is_nan() {
                    entry.issues.push(ReportIssue::undefined_ratio(symbol));
                }
                entry.status = ReportStatus::Ready;
                entry.card = Some(Card::watchlist(symbol, &quote));
                entry.quote = Some(quote);
            }
            Err(_) => {
                entry.status = ReportStatus::Empty;
                entry
                    .issues
                    .push(ReportIssue::empty_series(symbol, Period::OneDay));
            }
        }

        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnLabel, RawFrame, RawIndex};
    use std::collections::HashMap;
    use time::macros::datetime;

    /// In-memory source keyed by symbol.
    #[derive(Default)]
    struct StubSource {
        frames: HashMap<String, Result<RawFrame, SourceError>>,
        fundamentals: HashMap<String, Result<FinancialSnapshot, SourceError>>,
    }

    impl DataSource for StubSource {
        fn id(&self) -> ProviderId {
            ProviderId::Csv
        }

        fn fetch_series(&self, req: &SeriesRequest) -> Result<RawFrame, SourceError> {
            self.frames
                .get(req.symbol.as_str())
                .cloned()
                .unwrap_or_else(|| Ok(RawFrame::empty()))
        }

        fn fetch_fundamentals(&self, symbol: &Symbol) -> Result<FinancialSnapshot, SourceError> {
            self.fundamentals
                .get(symbol.as_str())
                .cloned()
                .unwrap_or_else(|| Ok(FinancialSnapshot::unavailable()))
        }
    }

    fn frame(closes: &[f64]) -> RawFrame {
        let columns = ["Open", "High", "Low", "Close", "Volume"]
            .into_iter()
            .map(ColumnLabel::flat)
            .collect();
        let index = (0..closes.len())
            .map(|day| datetime!(2024-01-02 21:00) + time::Duration::days(day as i64))
            .collect();
        let rows = closes
            .iter()
            .map(|&close| vec![Some(close), Some(close), Some(close), Some(close), Some(10.0)])
            .collect();
        RawFrame::new(columns, RawIndex::Naive(index), rows).expect("frame")
    }

    fn symbol(value: &str) -> Symbol {
        Symbol::parse(value).expect("symbol")
    }

    fn dashboard(source: StubSource) -> Dashboard {
        Dashboard::new(Arc::new(source), MarketZone::default())
    }

    #[test]
    fn ready_report_carries_metrics_and_indicators() {
        let mut source = StubSource::default();
        source
            .frames
            .insert("AAPL".into(), Ok(frame(&[100.0, 105.0, 98.0])));
        let request = DashboardRequest::new(symbol("AAPL"), Period::OneMonth).with_indicator(
            IndicatorSpec::new(crate::indicators::IndicatorKind::Sma, 2).expect("spec"),
        );

        let report = dashboard(source).report(&request);

        assert_eq!(report.status, ReportStatus::Ready);
        assert!(report.issues.is_empty());
        let metrics = report.metrics.expect("metrics");
        assert_eq!(metrics.change, -2.0);
        assert_eq!(report.indicators[0].values(), vec![None, Some(102.5), Some(101.5)]);
        assert_eq!(report.table().expect("series").expect("table").len(), 3);
    }

    #[test]
    fn empty_frame_is_reported_as_empty() {
        let report = dashboard(StubSource::default())
            .report(&DashboardRequest::new(symbol("ZZZZ"), Period::OneDay));

        assert_eq!(report.status, ReportStatus::Empty);
        assert_eq!(report.issues[0].code, CODE_SERIES_EMPTY);
        assert!(report.metrics.is_none());
        assert!(report.series.as_ref().is_some_and(Series::is_empty));
    }

    #[test]
    fn source_failure_is_reported_as_unavailable() {
        let mut source = StubSource::default();
        source.frames.insert(
            "AAPL".into(),
            Err(SourceError::unavailable("yahoo returned status 502")),
        );

        let report =
            dashboard(source).report(&DashboardRequest::new(symbol("AAPL"), Period::OneDay));

        assert_eq!(report.status, ReportStatus::Unavailable);
        assert_eq!(report.issues[0].code, "source.unavailable");
        assert!(report.issues[0].retryable);
    }

    #[test]
    fn malformed_frame_is_reported_as_unavailable() {
        let mut source = StubSource::default();
        let broken = RawFrame::new(
            vec![ColumnLabel::flat("Close")],
            RawIndex::Naive(vec![datetime!(2024-01-02 0:00)]),
            vec![vec![Some(1.0)]],
        )
        .expect("frame");
        source.frames.insert("AAPL".into(), Ok(broken));

        let report =
            dashboard(source).report(&DashboardRequest::new(symbol("AAPL"), Period::OneMonth));

        assert_eq!(report.status, ReportStatus::Unavailable);
        assert_eq!(report.issues[0].code, CODE_SERIES_MALFORMED);
    }

    #[test]
    fn fundamentals_flag_each_missing_field() {
        let mut source = StubSource::default();
        source.fundamentals.insert(
            "AAPL".into(),
            Ok(FinancialSnapshot::new(Some(3.8e11), None, Some(31.5))),
        );

        let report = dashboard(source).fundamentals(&symbol("AAPL"));

        assert_eq!(report.cards.market_cap.value, "N/A");
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].code, CODE_MISSING_FIELD);
        assert!(report.issues[0].message.contains("market_cap"));
    }

    #[test]
    fn fundamentals_failure_degrades_to_absent_snapshot() {
        let mut source = StubSource::default();
        source.fundamentals.insert(
            "AAPL".into(),
            Err(SourceError::rate_limited("slow down")),
        );

        let report = dashboard(source).fundamentals(&symbol("AAPL"));

        assert_eq!(report.snapshot, FinancialSnapshot::unavailable());
        assert_eq!(report.issues[0].code, "source.rate_limited");
        assert_eq!(report.issues.len(), 4);
    }

    #[test]
    fn rejected_input_is_an_invalid_request_issue() {
        let error = Symbol::parse("BRK/B").expect_err("slash is not allowed");

        let issue = ReportIssue::invalid_symbol("BRK/B", &error);

        assert_eq!(issue.code, "source.invalid_request");
        assert!(!issue.retryable);
        assert!(issue.message.starts_with("'BRK/B' is not a valid symbol"));
    }

    #[test]
    fn watchlist_entries_are_independent() {
        let mut source = StubSource::default();
        source
            .frames
            .insert("AAPL".into(), Ok(frame(&[100.0, 101.0])));
        source
            .frames
            .insert("MSFT".into(), Err(SourceError::unavailable("down")));

        let entries = dashboard(source).watchlist(&[symbol("AAPL"), symbol("MSFT"), symbol("AMZN")]);

        assert_eq!(entries[0].status, ReportStatus::Ready);
        assert_eq!(
            entries[0].card.as_ref().and_then(|card| card.delta.clone()),
            Some(String::from("1.00 (1.00%)"))
        );
        assert_eq!(entries[1].status, ReportStatus::Unavailable);
        assert_eq!(entries[2].status, ReportStatus::Empty);
    }
}

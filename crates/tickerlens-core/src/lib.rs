//! Core pipeline for tickerlens.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - The data source contract with Yahoo and CSV adapters
//! - Normalization of raw provider frames into zoned series
//! - Summary metrics and moving-average indicators
//! - Presentation helpers (tables, cards) and the response envelope

pub mod adapters;
pub mod config;
pub mod dashboard;
pub mod data_source;
pub mod display;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod indicators;
pub mod metrics;
pub mod normalizer;
pub mod source;
pub mod table;

pub use adapters::{CsvSource, YahooAuthManager, YahooSource};
pub use config::DashboardConfig;
pub use dashboard::{
    Dashboard, DashboardRequest, FundamentalsReport, ReportIssue, ReportStatus, SymbolReport,
    WatchlistEntry,
};
pub use data_source::{DataSource, SeriesRequest, SourceError, SourceErrorKind};
pub use display::{Card, MetricCards, SnapshotCards};
pub use domain::{
    Bar, ColumnLabel, FetchWindow, FinancialSnapshot, Interval, MarketTime, MarketZone, Period,
    RawFrame, RawIndex, Series, Symbol, UtcDateTime,
};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};
pub use error::{AnalysisError, NormalizeError, ValidationError};
pub use http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use indicators::{IndicatorEngine, IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorSpec};
pub use metrics::{SummaryMetrics, WatchlistQuote};
pub use normalizer::Normalizer;
pub use source::ProviderId;
pub use table::{SeriesTable, TableRow};

//! Data source contract and request types.
//!
//! A [`DataSource`] answers two questions for a symbol: "what are the raw
//! bars for this period?" and "what are its fundamentals?". Everything past
//! that boundary (normalization, metrics, indicators) lives in the core.
//!
//! | Operation | Request | Response |
//! |-----------|---------|----------|
//! | Series | [`SeriesRequest`] | [`RawFrame`] (empty when the provider has no bars) |
//! | Fundamentals | [`Symbol`] | [`FinancialSnapshot`] (per-field `None` when missing) |
//!
//! Calls are blocking and carry no retry policy: a failed fetch is reported
//! once and it is up to the caller to try again.

use std::fmt::{Display, Formatter};

use crate::{
    FetchWindow, FinancialSnapshot, Interval, Period, ProviderId, RawFrame, Symbol, UtcDateTime,
};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    Internal,
}

/// Structured error returned by a data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether a caller-side retry could plausibly succeed. The core itself
    /// never retries.
    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for series fetches.
///
/// The interval is normally derived from the period through
/// [`Period::interval`]; [`SeriesRequest::with_interval`] overrides it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub symbol: Symbol,
    pub period: Period,
    pub interval: Interval,
}

impl SeriesRequest {
    pub fn new(symbol: Symbol, period: Period) -> Self {
        Self {
            symbol,
            period,
            interval: period.interval(),
        }
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn window(&self, now: UtcDateTime) -> FetchWindow {
        self.period.window(now)
    }
}

/// Source adapter contract.
///
/// # Required Methods
///
/// | Method | Description |
/// |--------|-------------|
/// | [`id`](DataSource::id) | Provider identifier |
/// | [`fetch_series`](DataSource::fetch_series) | Raw OHLCV rows for a period |
/// | [`fetch_fundamentals`](DataSource::fetch_fundamentals) | Revenue, market cap, P/E |
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a front end can hold one source
/// behind an `Arc` and reuse it across requests.
pub trait DataSource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Fetches raw bars.
    ///
    /// An unknown symbol or a window without trades yields `Ok` with an
    /// empty frame.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the provider cannot be reached or its
    /// payload cannot be read.
    fn fetch_series(&self, req: &SeriesRequest) -> Result<RawFrame, SourceError>;

    /// Fetches fundamentals. Individual fields the provider does not report
    /// are `None`; only a failure of the whole call is an error.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the provider cannot be reached.
    fn fetch_fundamentals(&self, symbol: &Symbol) -> Result<FinancialSnapshot, SourceError>;
}

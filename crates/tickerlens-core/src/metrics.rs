use serde::Serialize;

use crate::error::AnalysisError;
use crate::Series;

/// Headline figures for the fetched window.
///
/// `change` compares the last close against the first close of the window,
/// not against the previous session. `percent_change` is NaN when the first
/// close is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub last_close: f64,
    pub first_close: f64,
    pub change: f64,
    pub percent_change: f64,
    pub period_high: f64,
    pub period_low: f64,
    pub total_volume: u64,
}

impl SummaryMetrics {
    /// # Errors
    ///
    /// Returns [`AnalysisError::EmptySeries`] for a series without bars.
    pub fn compute(series: &Series) -> Result<Self, AnalysisError> {
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(empty(series));
        };

        let change = last.close - first.close;
        let bars = series.bars();

        Ok(Self {
            last_close: last.close,
            first_close: first.close,
            change,
            percent_change: percent(change, first.close),
            period_high: bars.iter().map(|bar| bar.high).fold(f64::NEG_INFINITY, f64::max),
            period_low: bars.iter().map(|bar| bar.low).fold(f64::INFINITY, f64::min),
            total_volume: bars
                .iter()
                .fold(0_u64, |total, bar| total.saturating_add(bar.volume)),
        })
    }

    pub fn ratio_defined(&self) -> bool {
        !self.percent_change.is_nan()
    }
}

/// Watch-list line: last price against the first bar's open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WatchlistQuote {
    pub last_price: f64,
    pub first_open: f64,
    pub change: f64,
    pub percent_change: f64,
}

impl WatchlistQuote {
    /// # Errors
    ///
    /// Returns [`AnalysisError::EmptySeries`] for a series without bars.
    pub fn from_series(series: &Series) -> Result<Self, AnalysisError> {
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(empty(series));
        };

        let change = last.close - first.open;
        Ok(Self {
            last_price: last.close,
            first_open: first.open,
            change,
            percent_change: percent(change, first.open),
        })
    }
}

fn percent(change: f64, base: f64) -> f64 {
    if base == 0.0 {
        f64::NAN
    } else {
        100.0 * change / base
    }
}

fn empty(series: &Series) -> AnalysisError {
    AnalysisError::EmptySeries {
        symbol: series.symbol().to_string(),
    }
}

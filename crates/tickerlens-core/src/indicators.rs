use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::error::AnalysisError;
use crate::{MarketTime, Series, ValidationError};

/// Default moving-average window, in bars.
pub const DEFAULT_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Sma,
    Ema,
}

impl IndicatorKind {
    pub const ALL: [Self; 2] = [Self::Sma, Self::Ema];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sma => "sma",
            Self::Ema => "ema",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Sma => "SMA",
            Self::Ema => "EMA",
        }
    }
}

impl Display for IndicatorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sma" => Ok(Self::Sma),
            "ema" => Ok(Self::Ema),
            other => Err(ValidationError::InvalidIndicator {
                value: other.to_owned(),
            }),
        }
    }
}

/// Indicator kind plus its window (at least one bar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IndicatorSpec {
    kind: IndicatorKind,
    window: usize,
}

impl IndicatorSpec {
    pub fn new(kind: IndicatorKind, window: usize) -> Result<Self, ValidationError> {
        if window == 0 {
            return Err(ValidationError::ZeroIndicatorWindow);
        }
        Ok(Self { kind, window })
    }

    pub const fn kind(&self) -> IndicatorKind {
        self.kind
    }

    pub const fn window(&self) -> usize {
        self.window
    }

    /// Table column name, e.g. `SMA_20`.
    pub fn column_name(&self) -> String {
        format!("{}_{}", self.kind.label(), self.window)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub timestamp: MarketTime,
    /// `None` while the window is still filling.
    pub value: Option<f64>,
}

/// One indicator aligned point-for-point with its source series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSeries {
    pub spec: IndicatorSpec,
    pub points: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn column_name(&self) -> String {
        self.spec.column_name()
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|point| point.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Trailing mean of `window` closes. The first `window - 1` positions are
/// `None`; a window longer than the input yields only `None`.
pub fn sma(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    let warmup = (window - 1).min(closes.len());

    let mut values = vec![None; warmup];
    values.extend(
        closes
            .windows(window)
            .map(|slice| Some(slice.iter().sum::<f64>() / window as f64)),
    );
    values
}

/// Exponential average with `alpha = 2 / (window + 1)`, seeded with the first
/// close. Defined at every position.
pub fn ema(closes: &[f64], window: usize) -> Vec<f64> {
    let alpha = 2.0 / (window.max(1) as f64 + 1.0);

    let mut current: Option<f64> = None;
    closes
        .iter()
        .map(|&price| {
            let next = match current {
                None => price,
                Some(previous) => previous + alpha * (price - previous),
            };
            current = Some(next);
            next
        })
        .collect()
}

/// Computes moving averages over a series' closes.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine;

impl IndicatorEngine {
    /// One output per distinct spec, in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EmptySeries`] for a series without bars.
    pub fn compute(
        &self,
        series: &Series,
        specs: &[IndicatorSpec],
    ) -> Result<Vec<IndicatorSeries>, AnalysisError> {
        if series.is_empty() {
            return Err(AnalysisError::EmptySeries {
                symbol: series.symbol().to_string(),
            });
        }

        let mut distinct: Vec<IndicatorSpec> = Vec::with_capacity(specs.len());
        for spec in specs {
            if !distinct.contains(spec) {
                distinct.push(*spec);
            }
        }

        let closes = series.closes();
        let outputs = distinct
            .into_iter()
            .map(|spec| {
                let values = match spec.kind {
                    IndicatorKind::Sma => sma(&closes, spec.window),
                    IndicatorKind::Ema => ema(&closes, spec.window).into_iter().map(Some).collect(),
                };
                let points = series
                    .timestamps()
                    .zip(values)
                    .map(|(timestamp, value)| IndicatorPoint { timestamp, value })
                    .collect();
                IndicatorSeries { spec, points }
            })
            .collect::<Vec<_>>();

        debug!(
            symbol = %series.symbol(),
            bars = closes.len(),
            requested = specs.len(),
            computed = outputs.len(),
            "computed indicators"
        );

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bar, Interval, MarketZone, Period, Symbol, UtcDateTime};

    fn series(closes: &[f64]) -> Series {
        let zone = MarketZone::default();
        let start = UtcDateTime::parse("2024-01-02T21:00:00Z")
            .expect("timestamp")
            .into_inner();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(day, &close)| {
                let instant = start + time::Duration::days(day as i64);
                Bar::new(zone.convert(instant), close, close, close, close, 1)
            })
            .collect();
        Series::from_bars(
            Symbol::parse("AAPL").expect("symbol"),
            Period::OneMonth,
            Interval::OneDay,
            zone,
            bars,
        )
        .expect("series")
    }

    fn spec(kind: IndicatorKind, window: usize) -> IndicatorSpec {
        IndicatorSpec::new(kind, window).expect("valid spec")
    }

    #[test]
    fn sma_marks_warmup_as_unavailable() {
        assert_eq!(
            sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3),
            vec![None, None, Some(2.0), Some(3.0), Some(4.0)]
        );
    }

    #[test]
    fn sma_window_longer_than_series_is_all_unavailable() {
        assert_eq!(sma(&[1.0, 2.0], 5), vec![None, None]);
    }

    #[test]
    fn window_of_one_reproduces_closes() {
        let closes = [3.0, 1.0, 4.0, 1.5];
        assert_eq!(
            sma(&closes, 1),
            closes.iter().copied().map(Some).collect::<Vec<_>>()
        );
        assert_eq!(ema(&closes, 1), closes.to_vec());
    }

    #[test]
    fn ema_is_seeded_with_first_close() {
        let values = ema(&[10.0, 11.0, 12.0], 3);
        assert_eq!(values[0], 10.0);
        assert_eq!(values[1], 10.5);
        assert_eq!(values[2], 11.25);
    }

    #[test]
    fn rejects_zero_window_and_unknown_kind() {
        assert_eq!(
            IndicatorSpec::new(IndicatorKind::Sma, 0),
            Err(ValidationError::ZeroIndicatorWindow)
        );
        assert!(IndicatorKind::from_str("rsi").is_err());
        assert_eq!(IndicatorKind::from_str("EMA").expect("known"), IndicatorKind::Ema);
    }

    #[test]
    fn column_names_follow_kind_and_window() {
        assert_eq!(spec(IndicatorKind::Sma, 20).column_name(), "SMA_20");
        assert_eq!(spec(IndicatorKind::Ema, 9).column_name(), "EMA_9");
    }

    #[test]
    fn engine_aligns_output_and_dedups_specs() {
        let series = series(&[1.0, 2.0, 3.0, 4.0]);
        let sma2 = spec(IndicatorKind::Sma, 2);
        let ema2 = spec(IndicatorKind::Ema, 2);

        let outputs = IndicatorEngine
            .compute(&series, &[sma2, ema2, sma2])
            .expect("indicators");

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].spec, sma2);
        assert_eq!(outputs[0].values(), vec![None, Some(1.5), Some(2.5), Some(3.5)]);
        for output in &outputs {
            assert_eq!(output.len(), series.len());
            assert!(output
                .points
                .iter()
                .map(|point| point.timestamp)
                .eq(series.timestamps()));
        }
    }

    #[test]
    fn engine_accepts_no_specs() {
        let outputs = IndicatorEngine
            .compute(&series(&[1.0]), &[])
            .expect("indicators");
        assert!(outputs.is_empty());
    }

    #[test]
    fn engine_rejects_empty_series() {
        let empty = Series::empty(
            Symbol::parse("AAPL").expect("symbol"),
            Period::OneDay,
            Interval::OneMinute,
            MarketZone::default(),
        );
        assert!(IndicatorEngine
            .compute(&empty, &[spec(IndicatorKind::Sma, 20)])
            .is_err());
    }
}

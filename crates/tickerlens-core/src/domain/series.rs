use serde::Serialize;

use super::{Interval, MarketTime, MarketZone, Period, Symbol};
use crate::ValidationError;

/// One OHLCV observation.
///
/// Price ordering (`high >= open/close >= low`) is taken on trust from the
/// provider and is not re-checked here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bar {
    pub timestamp: MarketTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(
        timestamp: MarketTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Normalized bars for one symbol over one requested period/interval.
///
/// Timestamps are strictly ascending and all expressed in `zone`. A series is
/// immutable once built; every fetch produces a fresh one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    symbol: Symbol,
    period: Period,
    interval: Interval,
    zone: MarketZone,
    bars: Vec<Bar>,
}

impl Series {
    /// Builds a series from bars that already satisfy the ordering and zone
    /// invariants.
    pub fn from_bars(
        symbol: Symbol,
        period: Period,
        interval: Interval,
        zone: MarketZone,
        bars: Vec<Bar>,
    ) -> Result<Self, ValidationError> {
        for (index, bar) in bars.iter().enumerate() {
            if !zone.contains(bar.timestamp) {
                return Err(ValidationError::BarOutsideZone {
                    index,
                    zone: zone.name().to_owned(),
                });
            }
            if index > 0 && bars[index - 1].timestamp >= bar.timestamp {
                return Err(ValidationError::UnorderedSeries { index });
            }
        }

        Ok(Self::from_sorted(symbol, period, interval, zone, bars))
    }

    /// Callers guarantee the invariants (the normalizer sorts, dedups and
    /// converts before calling this).
    pub(crate) fn from_sorted(
        symbol: Symbol,
        period: Period,
        interval: Interval,
        zone: MarketZone,
        bars: Vec<Bar>,
    ) -> Self {
        Self {
            symbol,
            period,
            interval,
            zone,
            bars,
        }
    }

    pub fn empty(symbol: Symbol, period: Period, interval: Interval, zone: MarketZone) -> Self {
        Self::from_sorted(symbol, period, interval, zone, Vec::new())
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn zone(&self) -> MarketZone {
        self.zone
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.close).collect()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = MarketTime> + '_ {
        self.bars.iter().map(|bar| bar.timestamp)
    }
}

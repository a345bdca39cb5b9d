//! Raw frame → canonical [`Series`].
//!
//! | Step | Function |
//! |------|----------|
//! | Collapse column labels to their primary level | [`collapse_columns`] |
//! | Interpret a naive index as UTC | [`assume_utc`] |
//! | Express every instant in the target zone | [`convert_to_zone`] |
//! | Drop incomplete rows, sort, keep the last duplicate | [`Normalizer::normalize`] |

use time::OffsetDateTime;
use tracing::debug;

use crate::data_source::SeriesRequest;
use crate::error::NormalizeError;
use crate::{Bar, ColumnLabel, MarketTime, MarketZone, RawFrame, RawIndex, Series};

/// Collapses (possibly two-level) labels to their primary level.
pub fn collapse_columns(columns: &[ColumnLabel]) -> Vec<&str> {
    columns.iter().map(|label| label.primary.trim()).collect()
}

/// Returns every index entry as an instant; naive entries are read as UTC.
pub fn assume_utc(index: &RawIndex) -> Vec<OffsetDateTime> {
    match index {
        RawIndex::Naive(values) => values.iter().map(|value| value.assume_utc()).collect(),
        RawIndex::Aware(values) => values.clone(),
    }
}

/// Expresses each instant in `zone`, picking the offset in effect at that
/// instant.
pub fn convert_to_zone(instants: &[OffsetDateTime], zone: MarketZone) -> Vec<MarketTime> {
    instants.iter().map(|&instant| zone.convert(instant)).collect()
}

/// Positions of the canonical fields within a frame row.
#[derive(Debug, Clone, Copy)]
struct FieldColumns {
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl FieldColumns {
    fn resolve(names: &[&str], symbol: &str) -> Result<Self, NormalizeError> {
        let find = |field: &'static str| {
            names
                .iter()
                .position(|name| name.eq_ignore_ascii_case(field))
                .ok_or_else(|| NormalizeError::MissingColumn {
                    symbol: symbol.to_owned(),
                    field,
                })
        };

        Ok(Self {
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume")?,
        })
    }

    /// `None` when any price cell is missing or non-finite.
    fn bar(self, timestamp: MarketTime, row: &[Option<f64>]) -> Option<Bar> {
        let price = |position: usize| row[position].filter(|value| value.is_finite());
        let volume = row[self.volume]
            .filter(|value| value.is_finite() && *value > 0.0)
            .map_or(0, |value| value.round() as u64);

        Some(Bar::new(
            timestamp,
            price(self.open)?,
            price(self.high)?,
            price(self.low)?,
            price(self.close)?,
            volume,
        ))
    }
}

/// Maps provider output onto the canonical schema in one target zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    zone: MarketZone,
}

impl Normalizer {
    pub fn new(zone: MarketZone) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> MarketZone {
        self.zone
    }

    /// Builds a series for `request` out of `frame`.
    ///
    /// A frame without rows is a valid, empty series. Rows missing any price
    /// are skipped; a missing volume counts as zero.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::MissingColumn`] when a non-empty frame lacks
    /// one of the canonical fields.
    pub fn normalize(
        &self,
        request: &SeriesRequest,
        frame: &RawFrame,
    ) -> Result<Series, NormalizeError> {
        if frame.is_empty() {
            debug!(symbol = %request.symbol, "raw frame has no rows");
            return Ok(self.empty_series(request));
        }

        let names = collapse_columns(frame.columns());
        let fields = FieldColumns::resolve(&names, request.symbol.as_str())?;
        let timestamps = convert_to_zone(&assume_utc(frame.index()), self.zone);

        let mut bars: Vec<Bar> = timestamps
            .into_iter()
            .zip(frame.rows())
            .filter_map(|(timestamp, row)| fields.bar(timestamp, row))
            .collect();
        let dropped = frame.len() - bars.len();

        // Stable sort: among equal instants the later row stays last.
        bars.sort_by_key(|bar| bar.timestamp);
        let bars = keep_last_per_instant(bars);

        debug!(
            symbol = %request.symbol,
            rows = frame.len(),
            bars = bars.len(),
            dropped,
            multi_level = frame.is_multi_level(),
            naive_index = !frame.index().is_aware(),
            zone = self.zone.name(),
            "normalized raw frame"
        );

        Ok(Series::from_sorted(
            request.symbol.clone(),
            request.period,
            request.interval,
            self.zone,
            bars,
        ))
    }

    /// Re-expresses an existing series in this normalizer's zone. Identity
    /// when the zones already match.
    pub fn renormalize(&self, series: &Series) -> Series {
        let bars = series
            .bars()
            .iter()
            .map(|bar| Bar {
                timestamp: self.zone.convert(bar.timestamp.into_inner()),
                ..*bar
            })
            .collect();

        Series::from_sorted(
            series.symbol().clone(),
            series.period(),
            series.interval(),
            self.zone,
            bars,
        )
    }

    fn empty_series(&self, request: &SeriesRequest) -> Series {
        Series::empty(
            request.symbol.clone(),
            request.period,
            request.interval,
            self.zone,
        )
    }
}

fn keep_last_per_instant(bars: Vec<Bar>) -> Vec<Bar> {
    let mut unique: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match unique.last_mut() {
            Some(previous) if previous.timestamp == bar.timestamp => *previous = bar,
            _ => unique.push(bar),
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Period, Symbol};
    use time::macros::{datetime, offset};

    fn request(period: Period) -> SeriesRequest {
        SeriesRequest::new(Symbol::parse("AAPL").expect("valid symbol"), period)
    }

    fn flat_columns(names: &[&str]) -> Vec<ColumnLabel> {
        names.iter().copied().map(ColumnLabel::flat).collect()
    }

    fn ohlcv(close: f64) -> Vec<Option<f64>> {
        vec![Some(close), Some(close + 1.0), Some(close - 1.0), Some(close), Some(1_000.0)]
    }

    #[test]
    fn naive_index_is_read_as_utc_then_converted() {
        let frame = RawFrame::new(
            flat_columns(&["Open", "High", "Low", "Close", "Volume"]),
            RawIndex::Naive(vec![datetime!(2024-01-02 14:30), datetime!(2024-07-02 13:30)]),
            vec![ohlcv(100.0), ohlcv(101.0)],
        )
        .expect("frame");

        let series = Normalizer::default()
            .normalize(&request(Period::OneYear), &frame)
            .expect("normalizes");

        let first = series.bars()[0].timestamp.into_inner();
        let second = series.bars()[1].timestamp.into_inner();
        assert_eq!(first.offset(), offset!(-5));
        assert_eq!((first.hour(), first.minute()), (9, 30));
        assert_eq!(second.offset(), offset!(-4));
        assert_eq!((second.hour(), second.minute()), (9, 30));
    }

    #[test]
    fn aware_index_keeps_the_instant() {
        let instant = datetime!(2024-01-02 9:30 -5);
        let frame = RawFrame::new(
            flat_columns(&["Open", "High", "Low", "Close", "Volume"]),
            RawIndex::Aware(vec![instant]),
            vec![ohlcv(100.0)],
        )
        .expect("frame");

        let series = Normalizer::new(MarketZone::utc())
            .normalize(&request(Period::OneDay), &frame)
            .expect("normalizes");

        let stamp = series.bars()[0].timestamp.into_inner();
        assert_eq!(stamp, instant);
        assert_eq!(stamp.offset(), offset!(UTC));
        assert_eq!(stamp.hour(), 14);
    }

    #[test]
    fn multi_level_labels_collapse_and_first_occurrence_wins() {
        let columns = vec![
            ColumnLabel::nested("Close", "AAPL"),
            ColumnLabel::nested("High", "AAPL"),
            ColumnLabel::nested("Low", "AAPL"),
            ColumnLabel::nested("Open", "AAPL"),
            ColumnLabel::nested("Volume", "AAPL"),
            ColumnLabel::nested("close", "MSFT"),
        ];
        let frame = RawFrame::new(
            columns,
            RawIndex::Naive(vec![datetime!(2024-01-02 0:00)]),
            vec![vec![Some(185.0), Some(188.0), Some(183.0), Some(187.0), Some(5.0), Some(400.0)]],
        )
        .expect("frame");

        let series = Normalizer::default()
            .normalize(&request(Period::OneMonth), &frame)
            .expect("normalizes");

        let bar = series.bars()[0];
        assert_eq!(bar.close, 185.0);
        assert_eq!(bar.open, 187.0);
        assert_eq!(bar.volume, 5);
    }

    #[test]
    fn missing_canonical_column_is_reported() {
        let frame = RawFrame::new(
            flat_columns(&["Open", "High", "Low", "Volume"]),
            RawIndex::Naive(vec![datetime!(2024-01-02 0:00)]),
            vec![vec![Some(1.0), Some(1.0), Some(1.0), Some(1.0)]],
        )
        .expect("frame");

        let error = Normalizer::default()
            .normalize(&request(Period::OneMonth), &frame)
            .expect_err("must fail");

        assert_eq!(
            error,
            NormalizeError::MissingColumn {
                symbol: String::from("AAPL"),
                field: "close"
            }
        );
    }

    #[test]
    fn empty_frame_is_an_empty_series() {
        let series = Normalizer::default()
            .normalize(&request(Period::OneDay), &RawFrame::empty())
            .expect("empty is fine");
        assert!(series.is_empty());
        assert_eq!(series.zone(), MarketZone::default());
    }

    #[test]
    fn incomplete_rows_are_dropped_and_volume_defaults_to_zero() {
        let frame = RawFrame::new(
            flat_columns(&["Open", "High", "Low", "Close", "Volume"]),
            RawIndex::Naive(vec![
                datetime!(2024-01-02 0:00),
                datetime!(2024-01-03 0:00),
                datetime!(2024-01-04 0:00),
            ]),
            vec![
                ohlcv(100.0),
                vec![Some(1.0), Some(1.0), Some(1.0), Some(f64::NAN), Some(9.0)],
                vec![Some(2.0), Some(2.0), Some(2.0), Some(2.0), None],
            ],
        )
        .expect("frame");

        let series = Normalizer::default()
            .normalize(&request(Period::OneMonth), &frame)
            .expect("normalizes");

        assert_eq!(series.closes(), vec![100.0, 2.0]);
        assert_eq!(series.bars()[1].volume, 0);
    }

    #[test]
    fn unsorted_rows_are_sorted_and_last_duplicate_wins() {
        let frame = RawFrame::new(
            flat_columns(&["Open", "High", "Low", "Close", "Volume"]),
            RawIndex::Naive(vec![
                datetime!(2024-01-03 0:00),
                datetime!(2024-01-02 0:00),
                datetime!(2024-01-03 0:00),
            ]),
            vec![ohlcv(3.0), ohlcv(2.0), ohlcv(4.0)],
        )
        .expect("frame");

        let series = Normalizer::default()
            .normalize(&request(Period::OneMonth), &frame)
            .expect("normalizes");

        assert_eq!(series.closes(), vec![2.0, 4.0]);
    }

    #[test]
    fn renormalize_is_identity_for_same_zone() {
        let frame = RawFrame::new(
            flat_columns(&["Open", "High", "Low", "Close", "Volume"]),
            RawIndex::Naive(vec![datetime!(2024-03-10 6:00), datetime!(2024-03-10 8:00)]),
            vec![ohlcv(1.0), ohlcv(2.0)],
        )
        .expect("frame");
        let normalizer = Normalizer::default();
        let series = normalizer
            .normalize(&request(Period::OneDay), &frame)
            .expect("normalizes");

        assert_eq!(normalizer.renormalize(&series), series);

        let tokyo = Normalizer::new(MarketZone::parse("Asia/Tokyo").expect("zone"));
        let moved = tokyo.renormalize(&series);
        assert_eq!(moved.zone().name(), "Asia/Tokyo");
        assert_eq!(moved.bars()[0].timestamp, series.bars()[0].timestamp);
        assert_eq!(moved.bars()[0].timestamp.offset(), offset!(+9));
    }
}

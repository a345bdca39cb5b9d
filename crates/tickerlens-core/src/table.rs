use serde::Serialize;

use crate::display::{format_volume, NOT_AVAILABLE};
use crate::indicators::IndicatorSeries;
use crate::{MarketTime, Series, ValidationError};

/// Leading columns of every series table.
pub const BASE_COLUMNS: [&str; 6] = ["Datetime", "Open", "High", "Low", "Close", "Volume"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub datetime: MarketTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// One entry per indicator column, `None` where unavailable.
    pub indicators: Vec<Option<f64>>,
}

/// Tabular view of a series with optional indicator columns (`SMA_20`, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesTable {
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

impl SeriesTable {
    /// # Errors
    ///
    /// Returns [`ValidationError::MisalignedIndicator`] when an indicator does
    /// not have exactly one point per bar at the same timestamps.
    pub fn build(series: &Series, indicators: &[IndicatorSeries]) -> Result<Self, ValidationError> {
        for indicator in indicators {
            let aligned = indicator.len() == series.len()
                && indicator
                    .points
                    .iter()
                    .map(|point| point.timestamp)
                    .eq(series.timestamps());
            if !aligned {
                return Err(ValidationError::MisalignedIndicator {
                    column: indicator.column_name(),
                    actual: indicator.len(),
                    expected: series.len(),
                });
            }
        }

        let columns = BASE_COLUMNS
            .iter()
            .map(|name| (*name).to_owned())
            .chain(indicators.iter().map(IndicatorSeries::column_name))
            .collect();

        let rows = series
            .bars()
            .iter()
            .enumerate()
            .map(|(position, bar)| TableRow {
                datetime: bar.timestamp,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                indicators: indicators
                    .iter()
                    .map(|indicator| indicator.points[position].value)
                    .collect(),
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as display strings, in column order.
    pub fn render_cells(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut cells = vec![
                    row.datetime.format_rfc3339(),
                    format!("{:.2}", row.open),
                    format!("{:.2}", row.high),
                    format!("{:.2}", row.low),
                    format!("{:.2}", row.close),
                    format_volume(row.volume),
                ];
                cells.extend(row.indicators.iter().map(|value| match value {
                    Some(value) => format!("{value:.2}"),
                    None => NOT_AVAILABLE.to_owned(),
                }));
                cells
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{IndicatorEngine, IndicatorKind, IndicatorSpec};
    use crate::{Bar, Interval, MarketZone, Period, Symbol, UtcDateTime};

    fn series() -> Series {
        let zone = MarketZone::default();
        let bars = ["2024-01-02T21:00:00Z", "2024-01-03T21:00:00Z", "2024-01-04T21:00:00Z"]
            .iter()
            .zip([10.0, 11.0, 12.0])
            .map(|(stamp, close)| {
                let instant = UtcDateTime::parse(stamp).expect("timestamp").into_inner();
                Bar::new(zone.convert(instant), close, close, close, close, 1_500)
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

    #[test]
    fn columns_include_indicator_names() {
        let series = series();
        let specs = [
            IndicatorSpec::new(IndicatorKind::Sma, 2).expect("spec"),
            IndicatorSpec::new(IndicatorKind::Ema, 2).expect("spec"),
        ];
        let indicators = IndicatorEngine.compute(&series, &specs).expect("indicators");

        let table = SeriesTable::build(&series, &indicators).expect("table");

        assert_eq!(
            table.columns(),
            ["Datetime", "Open", "High", "Low", "Close", "Volume", "SMA_2", "EMA_2"]
        );
        assert_eq!(table.rows()[0].indicators, vec![None, Some(10.0)]);

        let cells = table.render_cells();
        assert_eq!(cells[0][0], "2024-01-02T16:00:00-05:00");
        assert_eq!(cells[0][5], "1,500");
        assert_eq!(cells[0][6], "N/A");
        assert_eq!(cells[1][6], "10.50");
    }

    #[test]
    fn misaligned_indicator_is_rejected() {
        let series = series();
        let spec = IndicatorSpec::new(IndicatorKind::Sma, 1).expect("spec");
        let mut indicators = IndicatorEngine.compute(&series, &[spec]).expect("indicators");
        indicators[0].points.pop();

        let error = SeriesTable::build(&series, &indicators).expect_err("must fail");
        assert!(matches!(
            error,
            ValidationError::MisalignedIndicator { actual: 2, expected: 3, .. }
        ));
    }
}

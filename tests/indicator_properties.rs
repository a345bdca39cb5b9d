//! Properties of the moving-average indicators

use tickerlens_core::indicators::{ema, sma};
use tickerlens_core::{
    DashboardRequest, IndicatorKind, IndicatorSpec, Normalizer, Period, SeriesRequest,
};
use tickerlens_tests::{daily_frame, symbol, FixtureSource};

const EPSILON: f64 = 1e-9;

#[test]
fn constant_prices_keep_both_averages_flat() {
    // Given: Thirty bars all closing at 42
    let closes = vec![42.0; 30];

    // When: SMA and EMA are computed with the default window
    let simple = sma(&closes, 20);
    let exponential = ema(&closes, 20);

    // Then: Every defined value equals the constant price
    assert!(simple.iter().flatten().all(|value| (value - 42.0).abs() < EPSILON));
    assert!(exponential.iter().all(|value| (value - 42.0).abs() < EPSILON));
}

#[test]
fn sma_is_unavailable_until_the_window_fills_while_ema_starts_immediately() {
    // Given: Five closes and a window of three
    let closes = [1.0, 2.0, 3.0, 4.0, 5.0];

    // When: Both averages are computed
    let simple = sma(&closes, 3);
    let exponential = ema(&closes, 3);

    // Then: SMA skips the first two positions
    assert_eq!(simple, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);

    // And: EMA is seeded with the first close and smooths with alpha = 0.5
    assert_eq!(exponential.len(), closes.len());
    assert_eq!(exponential[0], 1.0);
    assert!((exponential[1] - 1.5).abs() < EPSILON);
    assert!((exponential[2] - 2.25).abs() < EPSILON);
}

#[test]
fn window_longer_than_series_leaves_sma_undefined() {
    let simple = sma(&[10.0, 11.0], 20);
    assert_eq!(simple, vec![None, None]);
}

#[test]
fn indicator_points_align_with_bars() {
    // Given: A normalized series of 25 bars
    let closes: Vec<f64> = (1..=25).map(f64::from).collect();
    let series = Normalizer::default()
        .normalize(
            &SeriesRequest::new(symbol("NVDA"), Period::OneMonth),
            &daily_frame(&closes),
        )
        .expect("valid frame");
    let specs = [
        IndicatorSpec::new(IndicatorKind::Sma, 20).expect("spec"),
        IndicatorSpec::new(IndicatorKind::Ema, 20).expect("spec"),
    ];

    // When: The indicators are computed through a dashboard refresh
    let dashboard = FixtureSource::default()
        .with_frame("NVDA", daily_frame(&closes))
        .into_dashboard();
    let mut request = DashboardRequest::new(symbol("NVDA"), Period::OneMonth);
    for spec in specs {
        request = request.with_indicator(spec);
    }
    let report = dashboard.report(&request);

    // Then: Each indicator has one point per bar on the same timestamps
    assert_eq!(report.indicators.len(), 2);
    for indicator in &report.indicators {
        assert_eq!(indicator.len(), series.len());
        let stamps: Vec<_> = indicator.points.iter().map(|point| point.timestamp).collect();
        assert_eq!(stamps, series.timestamps().collect::<Vec<_>>());
    }
    assert_eq!(report.indicators[0].column_name(), "SMA_20");
    assert_eq!(report.indicators[0].values()[18], None);
    assert_eq!(report.indicators[0].values()[19], Some(10.5));

    // And: The table lists the indicator columns after the bar fields
    let table = report.table().expect("series").expect("aligned");
    assert_eq!(
        table.columns(),
        ["Datetime", "Open", "High", "Low", "Close", "Volume", "SMA_20", "EMA_20"]
    );
}

#[test]
fn duplicate_specs_are_computed_once() {
    let spec = IndicatorSpec::new(IndicatorKind::Ema, 5).expect("spec");
    let dashboard = FixtureSource::default()
        .with_frame("AMD", daily_frame(&[1.0, 2.0, 3.0]))
        .into_dashboard();

    let report = dashboard.report(
        &DashboardRequest::new(symbol("AMD"), Period::OneMonth)
            .with_indicator(spec)
            .with_indicator(spec),
    );

    assert_eq!(report.indicators.len(), 1);
}

//! Display strings for metric and fundamentals cards.

use serde::Serialize;

use crate::metrics::{SummaryMetrics, WatchlistQuote};
use crate::{FinancialSnapshot, Symbol};

pub const CURRENCY: &str = "USD";
pub const NOT_AVAILABLE: &str = "N/A";

/// Label, main value and optional delta line of one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
}

impl Card {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            delta: None,
        }
    }

    pub fn with_delta(mut self, delta: impl Into<String>) -> Self {
        self.delta = Some(delta.into());
        self
    }

    /// Watch-list line: `"AAPL"`, `"189.25 USD"`, `"1.25 (0.66%)"`.
    pub fn watchlist(symbol: &Symbol, quote: &WatchlistQuote) -> Self {
        Self::new(symbol.as_str(), format_price(quote.last_price))
            .with_delta(format_delta(quote.change, quote.percent_change))
    }
}

/// Last price, high, low and volume for the fetched window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricCards {
    pub last_price: Card,
    pub high: Card,
    pub low: Card,
    pub volume: Card,
}

impl MetricCards {
    pub fn new(symbol: &Symbol, metrics: &SummaryMetrics) -> Self {
        Self {
            last_price: Card::new(
                format!("{symbol} Last Price"),
                format_price(metrics.last_close),
            )
            .with_delta(format_delta(metrics.change, metrics.percent_change)),
            high: Card::new("High", format_price(metrics.period_high)),
            low: Card::new("Low", format_price(metrics.period_low)),
            volume: Card::new("Volume", format_volume(metrics.total_volume)),
        }
    }

    pub fn cards(&self) -> [&Card; 4] {
        [&self.last_price, &self.high, &self.low, &self.volume]
    }
}

/// Revenue, market capitalization and P/E.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotCards {
    pub revenue: Card,
    pub market_cap: Card,
    pub pe_ratio: Card,
}

impl SnapshotCards {
    pub fn new(snapshot: &FinancialSnapshot) -> Self {
        Self {
            revenue: Card::new("Revenue", format_billions(snapshot.revenue)),
            market_cap: Card::new("Market Capitalization", format_billions(snapshot.market_cap)),
            pe_ratio: Card::new("P/E Ratio", format_ratio(snapshot.pe_ratio)),
        }
    }

    pub fn cards(&self) -> [&Card; 3] {
        [&self.revenue, &self.market_cap, &self.pe_ratio]
    }
}

/// `98.5` → `"98.50 USD"`.
pub fn format_price(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2} {CURRENCY}")
    } else {
        NOT_AVAILABLE.to_owned()
    }
}

/// `(-2.0, -2.0)` → `"-2.00 (-2.00%)"`; an undefined percentage renders as
/// `"N/A"` inside the parentheses.
pub fn format_delta(change: f64, percent_change: f64) -> String {
    if percent_change.is_finite() {
        format!("{change:.2} ({percent_change:.2}%)")
    } else {
        format!("{change:.2} ({NOT_AVAILABLE})")
    }
}

/// Thousands separators: `1234567` → `"1,234,567"`.
pub fn format_volume(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (position, digit) in digits.chars().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// `383_290_000_000.0` → `"$383.29B"`.
pub fn format_billions(value: Option<f64>) -> String {
    match value.filter(|value| value.is_finite()) {
        Some(value) => format!("${:.2}B", value / 1e9),
        None => NOT_AVAILABLE.to_owned(),
    }
}

pub fn format_ratio(value: Option<f64>) -> String {
    match value.filter(|value| value.is_finite()) {
        Some(value) => format!("{value:.2}"),
        None => NOT_AVAILABLE.to_owned(),
    }
}

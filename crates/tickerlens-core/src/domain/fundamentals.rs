use serde::{Deserialize, Serialize};

/// Fundamentals shown next to the price chart.
///
/// Each field is independently optional: a provider that omits a value
/// yields `None`, never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub revenue: Option<f64>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
}

/// Field names used when reporting which values were absent.
pub const REVENUE: &str = "revenue";
pub const MARKET_CAP: &str = "market_cap";
pub const PE_RATIO: &str = "pe_ratio";

impl FinancialSnapshot {
    /// Non-finite inputs (NaN/inf placeholders some providers emit) are
    /// treated as absent.
    pub fn new(revenue: Option<f64>, market_cap: Option<f64>, pe_ratio: Option<f64>) -> Self {
        Self {
            revenue: revenue.filter(|value| value.is_finite()),
            market_cap: market_cap.filter(|value| value.is_finite()),
            pe_ratio: pe_ratio.filter(|value| value.is_finite()),
        }
    }

    /// Snapshot used when the source could not be reached at all.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            (REVENUE, self.revenue),
            (MARKET_CAP, self.market_cap),
            (PE_RATIO, self.pe_ratio),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

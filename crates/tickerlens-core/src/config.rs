use std::env;

use serde::Serialize;

use crate::indicators::DEFAULT_WINDOW;
use crate::{MarketZone, Symbol, ValidationError};

pub const ENV_TZ: &str = "TICKERLENS_TZ";
pub const ENV_INDICATOR_WINDOW: &str = "TICKERLENS_INDICATOR_WINDOW";
pub const ENV_WATCHLIST: &str = "TICKERLENS_WATCHLIST";
pub const ENV_HTTP_TIMEOUT_MS: &str = "TICKERLENS_HTTP_TIMEOUT_MS";

/// Symbols shown in the watch list when nothing else is configured.
pub const DEFAULT_WATCHLIST: [&str; 4] = ["AAPL", "GOOGL", "AMZN", "MSFT"];

/// Settings shared by every dashboard request.
///
/// Layering is defaults, then environment ([`DashboardConfig::from_env`]),
/// then explicit `with_*` overrides from the front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardConfig {
    zone: MarketZone,
    indicator_window: usize,
    watchlist: Vec<Symbol>,
    http_timeout_ms: Option<u64>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            zone: MarketZone::default(),
            indicator_window: DEFAULT_WINDOW,
            watchlist: DEFAULT_WATCHLIST
                .iter()
                .filter_map(|symbol| Symbol::parse(symbol).ok())
                .collect(),
            http_timeout_ms: None,
        }
    }
}

impl DashboardConfig {
    /// Defaults overridden by the `TICKERLENS_*` environment variables.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`DashboardConfig::from_env`] with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = read(ENV_TZ) {
            config.zone = MarketZone::parse(&value)?;
        }
        if let Some(value) = read(ENV_INDICATOR_WINDOW) {
            config = config.with_indicator_window(parse_number(ENV_INDICATOR_WINDOW, &value)?)?;
        }
        if let Some(value) = read(ENV_WATCHLIST) {
            config = config.with_watchlist(parse_watchlist(&value)?)?;
        }
        if let Some(value) = read(ENV_HTTP_TIMEOUT_MS) {
            let timeout_ms = parse_number(ENV_HTTP_TIMEOUT_MS, &value)?;
            config.http_timeout_ms = (timeout_ms > 0).then_some(timeout_ms);
        }

        Ok(config)
    }

    pub fn with_zone(mut self, zone: MarketZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_indicator_window(mut self, window: usize) -> Result<Self, ValidationError> {
        if window == 0 {
            return Err(ValidationError::ZeroIndicatorWindow);
        }
        self.indicator_window = window;
        Ok(self)
    }

    pub fn with_watchlist(mut self, watchlist: Vec<Symbol>) -> Result<Self, ValidationError> {
        if watchlist.is_empty() {
            return Err(ValidationError::InvalidSetting {
                key: ENV_WATCHLIST,
                value: String::new(),
            });
        }
        self.watchlist = watchlist;
        Ok(self)
    }

    /// `None` blocks until the provider answers.
    pub fn with_http_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.http_timeout_ms = timeout_ms;
        self
    }

    pub fn zone(&self) -> MarketZone {
        self.zone
    }

    pub fn indicator_window(&self) -> usize {
        self.indicator_window
    }

    pub fn watchlist(&self) -> &[Symbol] {
        &self.watchlist
    }

    pub fn http_timeout_ms(&self) -> Option<u64> {
        self.http_timeout_ms
    }
}

/// Splits `"aapl, msft  goog"` into symbols.
pub fn parse_watchlist(value: &str) -> Result<Vec<Symbol>, ValidationError> {
    value
        .split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(Symbol::parse)
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ValidationError> {
    value
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidSetting {
            key,
            value: value.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn defaults_match_dashboard_setup() {
        let config = DashboardConfig::default();

        assert_eq!(config.zone().name(), "US/Eastern");
        assert_eq!(config.indicator_window(), 20);
        assert_eq!(config.http_timeout_ms(), None);
        let names: Vec<&str> = config.watchlist().iter().map(Symbol::as_str).collect();
        assert_eq!(names, vec!["AAPL", "GOOGL", "AMZN", "MSFT"]);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = DashboardConfig::from_lookup(lookup(&[
            (ENV_TZ, "Europe/London"),
            (ENV_INDICATOR_WINDOW, "50"),
            (ENV_WATCHLIST, "nvda, tsla"),
            (ENV_HTTP_TIMEOUT_MS, "2500"),
        ]))
        .expect("valid config");

        assert_eq!(config.zone().name(), "Europe/London");
        assert_eq!(config.indicator_window(), 50);
        assert_eq!(config.watchlist().len(), 2);
        assert_eq!(config.watchlist()[0].as_str(), "NVDA");
        assert_eq!(config.http_timeout_ms(), Some(2_500));
    }

    #[test]
    fn zero_timeout_means_no_timeout() {
        let config = DashboardConfig::from_lookup(lookup(&[(ENV_HTTP_TIMEOUT_MS, "0")]))
            .expect("valid config");
        assert_eq!(config.http_timeout_ms(), None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            DashboardConfig::from_lookup(lookup(&[(ENV_TZ, "Mars/Olympus")])),
            Err(ValidationError::UnknownTimeZone { .. })
        ));
        assert!(matches!(
            DashboardConfig::from_lookup(lookup(&[(ENV_INDICATOR_WINDOW, "0")])),
            Err(ValidationError::ZeroIndicatorWindow)
        ));
        assert!(matches!(
            DashboardConfig::from_lookup(lookup(&[(ENV_INDICATOR_WINDOW, "twenty")])),
            Err(ValidationError::InvalidSetting { key: ENV_INDICATOR_WINDOW, .. })
        ));
    }

    #[test]
    fn blank_variables_are_ignored() {
        let config = DashboardConfig::from_lookup(lookup(&[(ENV_WATCHLIST, "  ")]))
            .expect("valid config");
        assert_eq!(config.watchlist().len(), 4);
    }
}

//! Bundled [`DataSource`](crate::DataSource) implementations.
//!
//! | Source | Backing |
//! |--------|---------|
//! | [`YahooSource`] | Yahoo Finance chart and quoteSummary APIs |
//! | [`CsvSource`] | Directory of price exports plus `fundamentals.json` |

pub mod csv;
pub mod yahoo;

pub use self::csv::CsvSource;
pub use self::yahoo::{YahooAuthManager, YahooSource};

//! # Domain Models
//!
//! Canonical types shared by the sources, the normalizer and the derivations.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated ticker |
//! | [`Period`] / [`Interval`] | Requested span and its fixed sampling granularity |
//! | [`FetchWindow`] | What a source actually asks its provider for |
//! | [`RawFrame`] | Provider rows before normalization |
//! | [`Bar`] / [`Series`] | Normalized OHLCV bars in one time zone |
//! | [`MarketZone`] / [`MarketTime`] | Target zone and zoned timestamps |
//! | [`FinancialSnapshot`] | Revenue, market cap and P/E, each optional |
//! | [`UtcDateTime`] | UTC timestamp |

pub mod fundamentals;

mod frame;
mod period;
mod series;
mod symbol;
mod timestamp;
mod zone;

pub use frame::{ColumnLabel, RawFrame, RawIndex};
pub use fundamentals::FinancialSnapshot;
pub use period::{FetchWindow, Interval, Period};
pub use series::{Bar, Series};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
pub use zone::{MarketTime, MarketZone};

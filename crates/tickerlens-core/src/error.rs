use thiserror::Error;

/// Validation and contract errors exposed by `tickerlens-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter, digit or '^': '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid period '{value}', expected one of 1d, 1wk, 1mo, 1y, max")]
    InvalidPeriod { value: String },
    #[error("invalid interval '{value}', expected one of 1m, 30m, 1d, 1wk")]
    InvalidInterval { value: String },
    #[error("invalid source '{value}', expected one of yahoo, csv")]
    InvalidSource { value: String },
    #[error("invalid indicator '{value}', expected one of sma, ema")]
    InvalidIndicator { value: String },
    #[error("indicator window must be at least 1")]
    ZeroIndicatorWindow,

    #[error("unknown time zone '{value}'")]
    UnknownTimeZone { value: String },
    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("timestamp is outside the supported range")]
    TimestampOutOfRange,

    #[error("frame index has {index_len} entries but {row_count} rows")]
    FrameIndexMismatch { index_len: usize, row_count: usize },
    #[error("frame row {row} has {actual} cells, expected {expected}")]
    FrameRowWidth {
        row: usize,
        actual: usize,
        expected: usize,
    },
    #[error("series timestamps must be strictly ascending (bar {index})")]
    UnorderedSeries { index: usize },
    #[error("bar {index} is not expressed in zone '{zone}'")]
    BarOutsideZone { index: usize, zone: String },
    #[error("indicator '{column}' has {actual} points, series has {expected} bars")]
    MisalignedIndicator {
        column: String,
        actual: usize,
        expected: usize,
    },

    #[error("invalid value '{value}' for setting '{key}'")]
    InvalidSetting { key: &'static str, value: String },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },
    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Raised when raw provider rows cannot be mapped onto the canonical schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("raw frame for '{symbol}' has no '{field}' column")]
    MissingColumn { symbol: String, field: &'static str },
}

/// Raised by derivations that require at least one bar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("series for '{symbol}' has no bars")]
    EmptySeries { symbol: String },
}

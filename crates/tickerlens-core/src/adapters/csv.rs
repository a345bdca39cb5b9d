use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use tracing::debug;

use crate::data_source::{DataSource, SeriesRequest, SourceError};
use crate::{ColumnLabel, FinancialSnapshot, ProviderId, RawFrame, RawIndex, Symbol};

/// Name of the fundamentals file inside the data directory.
pub const FUNDAMENTALS_FILE: &str = "fundamentals.json";

/// Offline source over a directory of price exports.
///
/// | File | Content |
/// |------|---------|
/// | `<SYMBOL>_<period>.csv` | Bars for one period (preferred) |
/// | `<SYMBOL>.csv` | Bars used for any period |
/// | `fundamentals.json` | `{"AAPL": {"totalRevenue": .., "marketCap": .., "trailingPE": ..}}` |
///
/// Index tickers drop their caret in file names (`^GSPC` reads `GSPC.csv`).
#[derive(Debug, Clone)]
pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn series_path(&self, req: &SeriesRequest) -> Option<PathBuf> {
        let stem = req.symbol.file_stem();
        [
            self.dir.join(format!("{stem}_{}.csv", req.period.as_str())),
            self.dir.join(format!("{stem}.csv")),
        ]
        .into_iter()
        .find(|path| path.is_file())
    }
}

impl DataSource for CsvSource {
    fn id(&self) -> ProviderId {
        ProviderId::Csv
    }

    fn fetch_series(&self, req: &SeriesRequest) -> Result<RawFrame, SourceError> {
        let Some(path) = self.series_path(req) else {
            debug!(symbol = %req.symbol, dir = %self.dir.display(), "no csv export for symbol");
            return Ok(RawFrame::empty());
        };

        debug!(symbol = %req.symbol, path = %path.display(), "reading csv export");
        let file = File::open(&path).map_err(|error| io_error(&path, &error))?;
        parse_series_csv(file).map_err(|error| {
            SourceError::internal(format!("{}: {}", path.display(), error.message()))
        })
    }

    fn fetch_fundamentals(&self, symbol: &Symbol) -> Result<FinancialSnapshot, SourceError> {
        let path = self.dir.join(FUNDAMENTALS_FILE);
        let body = match std::fs::read_to_string(&path) {
            Ok(body) => body,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(FinancialSnapshot::unavailable());
            }
            Err(error) => return Err(io_error(&path, &error)),
        };

        let mut entries: HashMap<String, FundamentalsEntry> = serde_json::from_str(&body)
            .map_err(|error| {
                SourceError::internal(format!("{}: invalid json: {error}", path.display()))
            })?;

        let entry = entries
            .drain()
            .find(|(key, _)| key.trim().eq_ignore_ascii_case(symbol.as_str()))
            .map(|(_, entry)| entry)
            .unwrap_or_default();

        Ok(FinancialSnapshot::new(
            entry.total_revenue,
            entry.market_cap,
            entry.trailing_pe,
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FundamentalsEntry {
    #[serde(rename = "totalRevenue", default)]
    total_revenue: Option<f64>,
    #[serde(rename = "marketCap", default)]
    market_cap: Option<f64>,
    #[serde(rename = "trailingPE", default)]
    trailing_pe: Option<f64>,
}

fn io_error(path: &Path, error: &io::Error) -> SourceError {
    SourceError::unavailable(format!("cannot read {}: {error}", path.display()))
}

enum Stamp {
    Naive(PrimitiveDateTime),
    Aware(OffsetDateTime),
}

/// Parses a price export into a raw frame.
///
/// Two layouts are understood:
///
/// ```text
/// Date,Open,High,Low,Close,Adj Close,Volume
/// 2024-01-02,187.15,188.44,183.89,185.64,184.94,82488700
/// ```
///
/// and the two-level export, whose labels become nested columns:
///
/// ```text
/// Price,Close,High,Low,Open,Volume
/// Ticker,AAPL,AAPL,AAPL,AAPL,AAPL
/// Date,,,,,
/// 2024-01-02,185.64,188.44,183.89,187.15,82488700
/// ```
pub fn parse_series_csv<R: Read>(reader: R) -> Result<RawFrame, SourceError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(reader);

    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| SourceError::internal(format!("invalid csv: {error}")))?;

    let mut records = records
        .into_iter()
        .filter(|record| record.iter().any(|cell| !cell.is_empty()));

    let Some(header) = records.next() else {
        return Ok(RawFrame::empty());
    };

    let primaries: Vec<String> = header.iter().skip(1).map(str::to_owned).collect();
    let mut pending = None;
    let columns: Vec<ColumnLabel> = if header
        .get(0)
        .is_some_and(|cell| cell.eq_ignore_ascii_case("price"))
    {
        let tickers = records
            .next()
            .filter(|record| record.get(0).is_some_and(|cell| cell.eq_ignore_ascii_case("ticker")))
            .ok_or_else(|| SourceError::internal("two-level export is missing its Ticker row"))?;

        // Index-name row ("Date,,,") is optional.
        if let Some(next) = records.next() {
            let is_index_row = next.iter().skip(1).all(str::is_empty);
            if !is_index_row {
                pending = Some(next);
            }
        }

        primaries
            .iter()
            .enumerate()
            .map(|(position, primary)| {
                let secondary = tickers.get(position + 1).unwrap_or_default();
                ColumnLabel::nested(primary.clone(), secondary)
            })
            .collect()
    } else {
        primaries.into_iter().map(ColumnLabel::flat).collect()
    };

    let mut stamps = Vec::new();
    let mut rows = Vec::new();
    for (line, record) in pending.into_iter().chain(records).enumerate() {
        let raw_stamp = record.get(0).unwrap_or_default();
        stamps.push(parse_stamp(raw_stamp).ok_or_else(|| {
            SourceError::internal(format!("data row {line}: unreadable timestamp '{raw_stamp}'"))
        })?);

        let cells = (0..columns.len())
            .map(|position| parse_cell(record.get(position + 1).unwrap_or_default(), line))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(cells);
    }

    let index = build_index(stamps)?;
    RawFrame::new(columns, index, rows).map_err(|error| SourceError::internal(error.to_string()))
}

fn parse_cell(cell: &str, line: usize) -> Result<Option<f64>, SourceError> {
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(Some)
        .map_err(|_| SourceError::internal(format!("data row {line}: '{cell}' is not a number")))
}

fn parse_stamp(value: &str) -> Option<Stamp> {
    let date_only = format_description!("[year]-[month]-[day]");
    let naive = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let aware = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
    );

    if let Ok(instant) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(Stamp::Aware(instant));
    }
    if let Ok(instant) = OffsetDateTime::parse(value, aware) {
        return Some(Stamp::Aware(instant));
    }
    if let Ok(local) = PrimitiveDateTime::parse(value, naive) {
        return Some(Stamp::Naive(local));
    }
    Date::parse(value, date_only)
        .ok()
        .map(|date| Stamp::Naive(date.midnight()))
}

fn build_index(stamps: Vec<Stamp>) -> Result<RawIndex, SourceError> {
    let aware = stamps
        .iter()
        .filter(|stamp| matches!(stamp, Stamp::Aware(_)))
        .count();

    if aware == 0 {
        let naive = stamps
            .into_iter()
            .filter_map(|stamp| match stamp {
                Stamp::Naive(value) => Some(value),
                Stamp::Aware(_) => None,
            })
            .collect();
        return Ok(RawIndex::Naive(naive));
    }

    if aware != stamps.len() {
        return Err(SourceError::internal(
            "export mixes timestamps with and without a UTC offset",
        ));
    }

    let instants = stamps
        .into_iter()
        .filter_map(|stamp| match stamp {
            Stamp::Aware(value) => Some(value),
            Stamp::Naive(_) => None,
        })
        .collect();
    Ok(RawIndex::Aware(instants))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Period;
    use std::fs;
    use tempfile::TempDir;
    use time::macros::datetime;

    const SINGLE_HEADER: &str = "\
Date,Open,High,Low,Close,Adj Close,Volume
2024-01-02,187.15,188.44,183.89,185.64,184.94,82488700
2024-01-03,184.22,185.88,183.43,184.25,183.55,58414500
";

    const TWO_LEVEL: &str = "\
Price,Close,High,Low,Open,Volume
Ticker,AAPL,AAPL,AAPL,AAPL,AAPL
Datetime,,,,,
2024-01-02 14:30:00+00:00,185.64,188.44,183.89,187.15,82488700
2024-01-02 15:00:00+00:00,185.10,185.90,184.90,185.64,
";

    fn request(symbol: &str, period: Period) -> SeriesRequest {
        SeriesRequest::new(Symbol::parse(symbol).expect("valid symbol"), period)
    }

    #[test]
    fn single_header_export_is_flat_and_naive() {
        let frame = parse_series_csv(SINGLE_HEADER.as_bytes()).expect("parses");

        assert_eq!(frame.len(), 2);
        assert!(!frame.is_multi_level());
        assert_eq!(frame.columns()[5], ColumnLabel::flat("Volume"));
        assert_eq!(
            frame.index(),
            &RawIndex::Naive(vec![datetime!(2024-01-02 0:00), datetime!(2024-01-03 0:00)])
        );
        assert_eq!(frame.rows()[0][3], Some(185.64));
    }

    #[test]
    fn two_level_export_keeps_nested_labels() {
        let frame = parse_series_csv(TWO_LEVEL.as_bytes()).expect("parses");

        assert!(frame.is_multi_level());
        assert_eq!(frame.columns()[0], ColumnLabel::nested("Close", "AAPL"));
        assert!(frame.index().is_aware());
        assert_eq!(frame.rows()[1][4], None);
    }

    #[test]
    fn mixed_index_is_rejected() {
        let body = "Date,Open,High,Low,Close,Volume\n\
                    2024-01-02,1,1,1,1,1\n\
                    2024-01-03T14:30:00Z,1,1,1,1,1\n";

        let error = parse_series_csv(body.as_bytes()).expect_err("must fail");
        assert_eq!(error.code(), "source.internal");
    }

    #[test]
    fn non_numeric_cell_is_rejected() {
        let body = "Date,Open,High,Low,Close,Volume\n2024-01-02,abc,1,1,1,1\n";
        let error = parse_series_csv(body.as_bytes()).expect_err("must fail");
        assert!(error.message().contains("not a number"));
    }

    #[test]
    fn period_specific_file_wins() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("AAPL.csv"), SINGLE_HEADER).expect("write");
        fs::write(
            dir.path().join("AAPL_1wk.csv"),
            "Date,Open,High,Low,Close,Volume\n2024-01-05 15:00:00,1,2,0.5,1.5,10\n",
        )
        .expect("write");
        let source = CsvSource::new(dir.path());

        let weekly = source
            .fetch_series(&request("aapl", Period::OneWeek))
            .expect("weekly export");
        let monthly = source
            .fetch_series(&request("AAPL", Period::OneMonth))
            .expect("fallback export");

        assert_eq!(weekly.len(), 1);
        assert_eq!(monthly.len(), 2);
    }

    #[test]
    fn missing_export_is_an_empty_frame() {
        let dir = TempDir::new().expect("temp dir");
        let frame = CsvSource::new(dir.path())
            .fetch_series(&request("ZZZZ", Period::OneDay))
            .expect("missing file is not an error");
        assert!(frame.is_empty());
    }

    #[test]
    fn index_symbols_drop_caret_in_file_name() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("GSPC.csv"), SINGLE_HEADER).expect("write");

        let frame = CsvSource::new(dir.path())
            .fetch_series(&request("^GSPC", Period::OneYear))
            .expect("export");
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn fundamentals_read_from_json_with_absent_fields() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(
            dir.path().join(FUNDAMENTALS_FILE),
            r#"{"AAPL": {"totalRevenue": 383285000000, "trailingPE": 31.52}}"#,
        )
        .expect("write");
        let source = CsvSource::new(dir.path());

        let snapshot = source
            .fetch_fundamentals(&Symbol::parse("AAPL").expect("valid"))
            .expect("fundamentals");
        assert_eq!(snapshot.revenue, Some(383_285_000_000.0));
        assert_eq!(snapshot.market_cap, None);

        let unknown = source
            .fetch_fundamentals(&Symbol::parse("MSFT").expect("valid"))
            .expect("unknown symbol is not an error");
        assert_eq!(unknown, FinancialSnapshot::unavailable());
    }

    #[test]
    fn missing_fundamentals_file_is_all_absent() {
        let dir = TempDir::new().expect("temp dir");
        let snapshot = CsvSource::new(dir.path())
            .fetch_fundamentals(&Symbol::parse("AAPL").expect("valid"))
            .expect("no file is not an error");
        assert_eq!(snapshot.missing_fields().len(), 3);
    }
}

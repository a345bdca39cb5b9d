use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::data_source::{DataSource, SeriesRequest, SourceError};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse};
use crate::{
    ColumnLabel, FetchWindow, FinancialSnapshot, ProviderId, RawFrame, RawIndex, Symbol,
    UtcDateTime,
};

const CHART_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SUMMARY_BASE: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const SUMMARY_MODULES: &str = "financialData,price,summaryDetail";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URLS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
const REFERER: &str = "https://finance.yahoo.com/";

/// Column order of frames built from chart payloads.
const CHART_COLUMNS: [&str; 5] = ["Open", "High", "Low", "Close", "Volume"];

// ============================================================================
// Cookie/crumb handshake
// ============================================================================

#[derive(Debug, Default)]
struct AuthState {
    crumb: Option<String>,
    refreshed_at: Option<Instant>,
}

/// Caches the crumb token quoteSummary requires.
///
/// The session cookie lives in the transport's cookie jar (or comes from
/// `YAHOO_COOKIE`); only the crumb is held here.
#[derive(Debug)]
pub struct YahooAuthManager {
    state: Mutex<AuthState>,
    ttl: Duration,
}

impl Default for YahooAuthManager {
    fn default() -> Self {
        Self::with_ttl(Duration::from_secs(3_600))
    }
}

impl YahooAuthManager {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            state: Mutex::new(AuthState::default()),
            ttl,
        }
    }

    fn cached_crumb(&self) -> Option<String> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match (&state.crumb, state.refreshed_at) {
            (Some(crumb), Some(at)) if at.elapsed() < self.ttl => Some(crumb.clone()),
            _ => None,
        }
    }

    /// Returns the cached crumb, running the handshake when it is missing or
    /// stale.
    pub fn crumb(
        &self,
        http_client: &dyn HttpClient,
        auth: &HttpAuth,
        timeout_ms: Option<u64>,
    ) -> Result<String, SourceError> {
        if let Some(crumb) = self.cached_crumb() {
            return Ok(crumb);
        }

        let crumb = Self::handshake(http_client, auth, timeout_ms)?;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.crumb = Some(crumb.clone());
        state.refreshed_at = Some(Instant::now());
        Ok(crumb)
    }

    pub fn invalidate(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = AuthState::default();
    }

    fn handshake(
        http_client: &dyn HttpClient,
        auth: &HttpAuth,
        timeout_ms: Option<u64>,
    ) -> Result<String, SourceError> {
        // fc.yahoo.com answers 404 but sets the session cookie.
        let cookie_request = HttpRequest::get(COOKIE_URL)
            .with_header("referer", REFERER)
            .with_auth(auth)
            .with_timeout_ms(timeout_ms);
        http_client.execute(cookie_request).map_err(|error| {
            SourceError::unavailable(format!("failed to fetch yahoo cookie: {}", error.message()))
        })?;

        for endpoint in CRUMB_URLS {
            let request = HttpRequest::get(endpoint)
                .with_header("referer", REFERER)
                .with_auth(auth)
                .with_timeout_ms(timeout_ms);

            let response = match http_client.execute(request) {
                Ok(response) => response,
                Err(error) => {
                    debug!(endpoint, error = %error, "crumb endpoint failed");
                    continue;
                }
            };

            if response.status == 429 {
                return Err(SourceError::rate_limited(
                    "yahoo rate limited while fetching crumb",
                ));
            }

            let body = response.body.trim();
            if !response.is_success() || body.is_empty() {
                continue;
            }
            if body.contains("<html") || body.contains("<!DOCTYPE") {
                continue;
            }
            if body.to_ascii_lowercase().contains("too many requests") {
                return Err(SourceError::rate_limited(
                    "yahoo rate limited while fetching crumb",
                ));
            }
            if body.len() < 100 && !body.contains(char::is_whitespace) {
                return Ok(body.to_owned());
            }
        }

        Err(SourceError::unavailable(
            "failed to fetch yahoo crumb from all endpoints",
        ))
    }
}

// ============================================================================
// Yahoo source
// ============================================================================

/// Yahoo Finance source: chart API for bars, quoteSummary for fundamentals.
#[derive(Clone)]
pub struct YahooSource {
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
    auth_manager: Arc<YahooAuthManager>,
    timeout_ms: Option<u64>,
}

impl YahooSource {
    /// Picks up `YAHOO_COOKIE` as a fixed session cookie when set.
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        let auth = std::env::var("YAHOO_COOKIE")
            .ok()
            .filter(|cookie| !cookie.trim().is_empty())
            .map_or(HttpAuth::None, HttpAuth::Cookie);

        Self::with_auth(http_client, auth)
    }

    pub fn with_auth(http_client: Arc<dyn HttpClient>, auth: HttpAuth) -> Self {
        Self {
            http_client,
            auth,
            auth_manager: Arc::new(YahooAuthManager::default()),
            timeout_ms: None,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout_ms(&self) -> Option<u64> {
        self.timeout_ms
    }

    fn request(&self, url: &str) -> HttpRequest {
        HttpRequest::get(url)
            .with_header("referer", REFERER)
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms)
    }

    fn send(&self, url: &str) -> Result<HttpResponse, SourceError> {
        self.http_client.execute(self.request(url)).map_err(|error| {
            if error.timed_out() {
                SourceError::unavailable(format!("yahoo request timed out: {}", error.message()))
            } else {
                SourceError::unavailable(format!("yahoo transport error: {}", error.message()))
            }
        })
    }

    fn summary_url(&self, symbol: &Symbol, crumb: &str) -> String {
        format!(
            "{SUMMARY_BASE}/{}?modules={SUMMARY_MODULES}&crumb={}",
            urlencoding::encode(symbol.as_str()),
            urlencoding::encode(crumb)
        )
    }

    fn crumb(&self) -> Result<String, SourceError> {
        self.auth_manager
            .crumb(self.http_client.as_ref(), &self.auth, self.timeout_ms)
    }
}

/// Builds the chart URL for a request resolved against `now`.
pub fn chart_url(request: &SeriesRequest, now: UtcDateTime) -> String {
    let symbol = urlencoding::encode(request.symbol.as_str());
    let interval = request.interval.as_str();

    match request.window(now) {
        FetchWindow::Range(period) => format!(
            "{CHART_BASE}/{symbol}?range={}&interval={interval}&includePrePost=false",
            period.as_str()
        ),
        FetchWindow::Between { start, end } => format!(
            "{CHART_BASE}/{symbol}?period1={}&period2={}&interval={interval}&includePrePost=false",
            start.unix_timestamp(),
            end.unix_timestamp()
        ),
    }
}

impl DataSource for YahooSource {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn fetch_series(&self, req: &SeriesRequest) -> Result<RawFrame, SourceError> {
        let url = chart_url(req, UtcDateTime::now());
        debug!(symbol = %req.symbol, period = %req.period, interval = %req.interval, "requesting yahoo chart");

        let response = self.send(&url)?;
        match response.status {
            404 => {
                debug!(symbol = %req.symbol, "yahoo has no chart for symbol");
                Ok(RawFrame::empty())
            }
            429 => Err(SourceError::rate_limited("yahoo chart request rate limited")),
            status if !(200..300).contains(&status) => Err(SourceError::unavailable(format!(
                "yahoo chart returned status {status}"
            ))),
            _ => parse_chart(&response.body),
        }
    }

    fn fetch_fundamentals(&self, symbol: &Symbol) -> Result<FinancialSnapshot, SourceError> {
        let crumb = self.crumb()?;
        let mut response = self.send(&self.summary_url(symbol, &crumb))?;

        // Stale session: repair auth once and re-issue the same call.
        if matches!(response.status, 401 | 403 | 429) {
            warn!(symbol = %symbol, status = response.status, "yahoo rejected crumb; refreshing");
            self.auth_manager.invalidate();
            let crumb = self.crumb()?;
            response = self.send(&self.summary_url(symbol, &crumb))?;
        }

        match response.status {
            404 => Ok(FinancialSnapshot::unavailable()),
            429 => Err(SourceError::rate_limited(
                "yahoo quoteSummary request rate limited",
            )),
            status if !(200..300).contains(&status) => Err(SourceError::unavailable(format!(
                "yahoo quoteSummary returned status {status}"
            ))),
            _ => parse_summary(&response.body),
        }
    }
}

// ============================================================================
// Payload parsing
// ============================================================================

/// Maps a chart payload onto a timezone-aware raw frame.
pub fn parse_chart(body: &str) -> Result<RawFrame, SourceError> {
    let payload: ChartEnvelope = serde_json::from_str(body)
        .map_err(|error| SourceError::internal(format!("failed to parse yahoo chart: {error}")))?;

    if let Some(error) = payload.chart.error {
        return match error.code.as_str() {
            "Not Found" => Ok(RawFrame::empty()),
            "Bad Request" => Err(SourceError::invalid_request(error.describe())),
            _ => Err(SourceError::unavailable(error.describe())),
        };
    }

    let Some(result) = payload.chart.result.and_then(|results| results.into_iter().next())
    else {
        return Ok(RawFrame::empty());
    };
    let Some(timestamps) = result.timestamp.filter(|values| !values.is_empty()) else {
        return Ok(RawFrame::empty());
    };
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let index = timestamps
        .iter()
        .map(|&seconds| {
            OffsetDateTime::from_unix_timestamp(seconds).map_err(|error| {
                SourceError::internal(format!("invalid chart timestamp {seconds}: {error}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let cell = |values: &[Option<f64>], row: usize| values.get(row).copied().flatten();
    let rows = (0..index.len())
        .map(|row| {
            vec![
                cell(&quote.open, row),
                cell(&quote.high, row),
                cell(&quote.low, row),
                cell(&quote.close, row),
                cell(&quote.volume, row),
            ]
        })
        .collect();

    let columns = CHART_COLUMNS.into_iter().map(ColumnLabel::flat).collect();
    RawFrame::new(columns, RawIndex::Aware(index), rows)
        .map_err(|error| SourceError::internal(format!("malformed yahoo chart: {error}")))
}

/// Extracts revenue, market cap and trailing P/E from a quoteSummary payload.
pub fn parse_summary(body: &str) -> Result<FinancialSnapshot, SourceError> {
    let payload: SummaryEnvelope = serde_json::from_str(body).map_err(|error| {
        SourceError::internal(format!("failed to parse yahoo quoteSummary: {error}"))
    })?;

    if let Some(error) = payload.quote_summary.error {
        return match error.code.as_str() {
            "Not Found" => Ok(FinancialSnapshot::unavailable()),
            _ => Err(SourceError::unavailable(error.describe())),
        };
    }

    let Some(result) = payload
        .quote_summary
        .result
        .and_then(|results| results.into_iter().next())
    else {
        return Ok(FinancialSnapshot::unavailable());
    };

    let revenue = result
        .financial_data
        .as_ref()
        .and_then(|data| RawValue::value(&data.total_revenue));
    let market_cap = result
        .price
        .as_ref()
        .and_then(|price| RawValue::value(&price.market_cap))
        .or_else(|| {
            result
                .summary_detail
                .as_ref()
                .and_then(|detail| RawValue::value(&detail.market_cap))
        });
    let pe_ratio = result
        .summary_detail
        .as_ref()
        .and_then(|detail| RawValue::value(&detail.trailing_pe));

    Ok(FinancialSnapshot::new(revenue, market_cap, pe_ratio))
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct YahooApiError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

impl YahooApiError {
    fn describe(&self) -> String {
        match &self.description {
            Some(description) => format!("yahoo error {}: {description}", self.code),
            None => format!("yahoo error {}", self.code),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: SummaryBody,
}

#[derive(Debug, Deserialize)]
struct SummaryBody {
    #[serde(default)]
    result: Option<Vec<SummaryResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    #[serde(rename = "financialData", default)]
    financial_data: Option<FinancialDataModule>,
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(rename = "summaryDetail", default)]
    summary_detail: Option<SummaryDetailModule>,
}

#[derive(Debug, Deserialize)]
struct FinancialDataModule {
    #[serde(rename = "totalRevenue", default)]
    total_revenue: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct PriceModule {
    #[serde(rename = "marketCap", default)]
    market_cap: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct SummaryDetailModule {
    #[serde(rename = "marketCap", default)]
    market_cap: Option<RawValue>,
    #[serde(rename = "trailingPE", default)]
    trailing_pe: Option<RawValue>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`; unreported values
/// come back as `{}`.
#[derive(Debug, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

impl RawValue {
    fn value(value: &Option<Self>) -> Option<f64> {
        value.as_ref().and_then(|value| value.raw)
    }
}

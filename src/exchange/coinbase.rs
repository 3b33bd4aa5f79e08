//! Coinbase Exchange public market-data integration.
//!
//! API docs: https://docs.cdp.coinbase.com/exchange/reference
//! Base URL: https://api.exchange.coinbase.com
//! Rate limit: 10 requests/second per IP for public endpoints
//! Auth: Not required for products, stats, or candles.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::MarketDataSource;
use crate::types::{Candle, CandleSeries, Pair, PairStats, SourceError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://api.exchange.coinbase.com";
const SOURCE_NAME: &str = "coinbase";

/// The candles endpoint returns at most this many buckets per request.
pub const MAX_CANDLES_PER_REQUEST: u32 = 300;

// ---------------------------------------------------------------------------
// API response types (Coinbase JSON → Rust)
// ---------------------------------------------------------------------------

/// Entry of `GET /products`. Only the fields we need.
#[derive(Debug, Deserialize)]
struct CoinbaseProduct {
    id: String,
    base_currency: String,
    quote_currency: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    trading_disabled: bool,
}

/// `GET /products/{id}/stats`. Coinbase sends decimals as strings.
#[derive(Debug, Deserialize)]
struct CoinbaseStats {
    #[serde(default)]
    high: Option<String>,
    #[serde(default)]
    low: Option<String>,
    #[serde(default)]
    last: Option<String>,
    #[serde(default)]
    volume: Option<String>,
}

/// Row of `GET /products/{id}/candles`: `[time, low, high, open, close, volume]`.
type CandleRow = [f64; 6];

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Coinbase Exchange market-data client.
pub struct CoinbaseClient {
    http: Client,
    base_url: String,
}

impl CoinbaseClient {
    /// Create a new client. `base_url` defaults to the production API.
    pub fn new(base_url: Option<String>, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent("SQUEEZE/0.1.0 (market-scanner)")
            .build()
            .context("Failed to build HTTP client for Coinbase")?;

        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self { http, base_url })
    }

    // -- Internal helpers ------------------------------------------------

    fn product_url(&self, pair: &Pair, endpoint: &str) -> String {
        format!(
            "{}/products/{}/{endpoint}",
            self.base_url,
            urlencoding::encode(&pair.id()),
        )
    }

    /// GET `url` and decode the JSON body, mapping failures onto `SourceError`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, SourceError> {
        debug!(url = %url, "Fetching Coinbase {what}");

        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(format!("{what} request failed: {e}")))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Unavailable(format!(
                "Coinbase API error {status} for {what}: {body}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| SourceError::Unavailable(format!("Failed to parse {what}: {e}")))
    }

    fn parse_decimal(value: Option<&str>, field: &str) -> Result<Decimal, SourceError> {
        let raw = value.ok_or_else(|| SourceError::Unavailable(format!("missing {field}")))?;
        Decimal::from_str(raw)
            .map_err(|e| SourceError::Unavailable(format!("bad {field} {raw:?}: {e}")))
    }

    fn to_pair(product: CoinbaseProduct) -> Option<Pair> {
        if product.trading_disabled {
            return None;
        }
        if let Some(status) = product.status.as_deref() {
            if status != "online" {
                return None;
            }
        }
        if product.base_currency.is_empty() || product.quote_currency.is_empty() {
            debug!(id = %product.id, "Skipping product with missing currencies");
            return None;
        }
        Some(Pair::new(&product.base_currency, &product.quote_currency))
    }

    fn to_stats(pair: &Pair, raw: CoinbaseStats) -> Result<PairStats, SourceError> {
        Ok(PairStats {
            pair: pair.clone(),
            last_price: Self::parse_decimal(raw.last.as_deref(), "last")?,
            volume_24h: Self::parse_decimal(raw.volume.as_deref(), "volume")?,
            high_24h: Self::parse_decimal(raw.high.as_deref(), "high")?,
            low_24h: Self::parse_decimal(raw.low.as_deref(), "low")?,
        })
    }

    /// Convert a candle row. Rows with a bad timestamp or non-finite
    /// numbers are dropped rather than failing the whole series.
    fn to_candle(row: &CandleRow) -> Option<Candle> {
        let [time, low, high, open, close, volume] = *row;
        let open_time = Self::secs_to_datetime(time as i64)?;
        Some(Candle {
            open_time,
            open: Decimal::from_f64(open)?,
            high: Decimal::from_f64(high)?,
            low: Decimal::from_f64(low)?,
            close: Decimal::from_f64(close)?,
            volume: Decimal::from_f64(volume)?,
        })
    }

    fn secs_to_datetime(secs: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(secs, 0).single()
    }

    /// Request window covering `count` buckets of `granularity_secs`, ending at `end`.
    fn candle_window(
        end: DateTime<Utc>,
        granularity_secs: u32,
        count: u32,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        let count = count.clamp(1, MAX_CANDLES_PER_REQUEST);
        let span = Duration::seconds(i64::from(granularity_secs) * i64::from(count));
        (end - span, end)
    }
}

// ---------------------------------------------------------------------------
// MarketDataSource trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl MarketDataSource for CoinbaseClient {
    async fn list_products(&self) -> Result<Vec<Pair>, SourceError> {
        let url = format!("{}/products", self.base_url);
        let products: Vec<CoinbaseProduct> = self.get_json(&url, &[], "products").await?;
        let total = products.len();

        let pairs: Vec<Pair> = products.into_iter().filter_map(Self::to_pair).collect();

        debug!(total, tradable = pairs.len(), "Coinbase products listed");
        Ok(pairs)
    }

    async fn get_stats(&self, pair: &Pair) -> Result<PairStats, SourceError> {
        let url = self.product_url(pair, "stats");
        let raw: CoinbaseStats = self
            .get_json(&url, &[], &format!("stats for {pair}"))
            .await?;
        Self::to_stats(pair, raw)
    }

    async fn get_candles(
        &self,
        pair: &Pair,
        granularity_secs: u32,
        lookback_count: u32,
    ) -> Result<CandleSeries, SourceError> {
        if lookback_count > MAX_CANDLES_PER_REQUEST {
            warn!(
                pair = %pair,
                requested = lookback_count,
                limit = MAX_CANDLES_PER_REQUEST,
                "Candle lookback exceeds the per-request limit, clamping"
            );
        }
        let url = self.product_url(pair, "candles");
        let (start, end) = Self::candle_window(Utc::now(), granularity_secs, lookback_count);
        let query = [
            ("granularity", granularity_secs.to_string()),
            ("start", start.to_rfc3339()),
            ("end", end.to_rfc3339()),
        ];

        let rows: Vec<CandleRow> = self
            .get_json(&url, &query, &format!("candles for {pair}"))
            .await?;
        let received = rows.len();

        let series = CandleSeries::new(rows.iter().filter_map(Self::to_candle).collect());

        debug!(
            pair = %pair,
            granularity_secs,
            received,
            kept = series.len(),
            "Coinbase candles fetched"
        );
        Ok(series)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Mock market-data source for integration testing.
//!
//! Serves a frozen snapshot of products, stats and candles from memory.
//! Failures can be injected per pair, and every call is logged so tests
//! can assert on what the scanner fetched and in which order.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use squeeze::exchange::MarketDataSource;
use squeeze::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    ListProducts,
    Stats,
    Candles,
}

/// A deterministic market-data source.
pub struct MockSource {
    products: Vec<Pair>,
    stats: HashMap<Pair, PairStats>,
    candles: HashMap<Pair, CandleSeries>,
    list_error: Arc<Mutex<Option<SourceError>>>,
    stats_errors: Arc<Mutex<HashMap<Pair, SourceError>>>,
    candle_errors: Arc<Mutex<HashMap<Pair, SourceError>>>,
    calls: Arc<Mutex<Vec<(Call, Option<Pair>)>>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
            stats: HashMap::new(),
            candles: HashMap::new(),
            list_error: Arc::new(Mutex::new(None)),
            stats_errors: Arc::new(Mutex::new(HashMap::new())),
            candle_errors: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// List `id` with the given 24h volume and candle closes.
    pub fn with_pair(mut self, id: &str, volume_24h: Decimal, closes: &[Decimal]) -> Self {
        let pair: Pair = id.parse().unwrap();
        let last = closes.last().copied().unwrap_or(Decimal::ZERO);
        self.stats.insert(
            pair.clone(),
            PairStats {
                pair: pair.clone(),
                last_price: last,
                volume_24h,
                high_24h: last * dec!(1.05),
                low_24h: last * dec!(0.95),
            },
        );
        self.candles.insert(pair.clone(), hourly_series(closes));
        self.products.push(pair);
        self
    }

    /// Replace the candle series served for `id`.
    pub fn with_series(mut self, id: &str, series: CandleSeries) -> Self {
        self.candles.insert(id.parse().unwrap(), series);
        self
    }

    pub fn fail_listing(&self, err: SourceError) {
        *self.list_error.lock().unwrap() = Some(err);
    }

    pub fn fail_stats(&self, id: &str, err: SourceError) {
        self.stats_errors.lock().unwrap().insert(id.parse().unwrap(), err);
    }

    pub fn fail_candles(&self, id: &str, err: SourceError) {
        self.candle_errors.lock().unwrap().insert(id.parse().unwrap(), err);
    }

    pub fn calls(&self) -> Vec<(Call, Option<Pair>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, kind: Call) -> usize {
        self.calls().iter().filter(|(c, _)| *c == kind).count()
    }

    fn record(&self, call: Call, pair: Option<&Pair>) {
        self.calls.lock().unwrap().push((call, pair.cloned()));
    }
}

#[async_trait]
impl MarketDataSource for MockSource {
    async fn list_products(&self) -> Result<Vec<Pair>, SourceError> {
        self.record(Call::ListProducts, None);
        if let Some(err) = self.list_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.products.clone())
    }

    async fn get_stats(&self, pair: &Pair) -> Result<PairStats, SourceError> {
        self.record(Call::Stats, Some(pair));
        if let Some(err) = self.stats_errors.lock().unwrap().get(pair) {
            return Err(err.clone());
        }
        self.stats
            .get(pair)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(pair.id()))
    }

    async fn get_candles(
        &self,
        pair: &Pair,
        _granularity_secs: u32,
        lookback_count: u32,
    ) -> Result<CandleSeries, SourceError> {
        self.record(Call::Candles, Some(pair));
        if let Some(err) = self.candle_errors.lock().unwrap().get(pair) {
            return Err(err.clone());
        }
        let series = self
            .candles
            .get(pair)
            .ok_or_else(|| SourceError::NotFound(pair.id()))?;
        let candles = series.candles();
        let start = candles.len().saturating_sub(lookback_count as usize);
        Ok(CandleSeries::new(candles[start..].to_vec()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Series builders
// ---------------------------------------------------------------------------

/// Hourly candles with the given closes, ±1% range and constant volume.
pub fn hourly_series(closes: &[Decimal]) -> CandleSeries {
    CandleSeries::new(
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| Candle {
                open_time: Utc.timestamp_opt(1_700_000_000 + i as i64 * 3600, 0).unwrap(),
                open: *close,
                high: *close * dec!(1.01),
                low: *close * dec!(0.99),
                close: *close,
                volume: dec!(100),
            })
            .collect(),
    )
}

/// `n` closes starting at `start`, moving by `step` each candle.
pub fn ramp(start: i64, step: i64, n: usize) -> Vec<Decimal> {
    (0..n as i64).map(|i| Decimal::from(start + step * i)).collect()
}

/// `n` constant closes.
pub fn flat(price: i64, n: usize) -> Vec<Decimal> {
    vec![Decimal::from(price); n]
}

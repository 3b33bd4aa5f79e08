//! Shared types for the SQUEEZE scanner.
//!
//! These types form the data model used across all modules.
//! Everything here is a value object owned by the scan that produced it;
//! nothing is persisted or shared between scans.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Pair
// ---------------------------------------------------------------------------

/// A tradable pair, e.g. base `BTC` quoted in `USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pair {
    pub base: String,
    pub quote: String,
}

impl Pair {
    pub fn new(base: &str, quote: &str) -> Self {
        Self {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        }
    }

    /// Exchange-style identifier (`BASE-QUOTE`).
    pub fn id(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }

    /// Whether this pair is quoted in `currency` (case-insensitive).
    pub fn is_quoted_in(&self, currency: &str) -> bool {
        self.quote.eq_ignore_ascii_case(currency)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

/// Parse `BASE-QUOTE` (also accepts `BASE/QUOTE`).
impl std::str::FromStr for Pair {
    type Err = SqueezeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(|c: char| c == '-' || c == '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => {
                Ok(Pair::new(base, quote))
            }
            _ => Err(SqueezeError::InvalidConfiguration(format!(
                "invalid pair identifier: {s:?}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// 24-hour statistics for a pair, fetched fresh every scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairStats {
    pub pair: Pair,
    pub last_price: Decimal,
    /// 24-hour volume in base units.
    pub volume_24h: Decimal,
    pub high_24h: Decimal,
    pub low_24h: Decimal,
}

impl PairStats {
    /// Helper to build test stats with sensible defaults.
    #[cfg(test)]
    pub fn sample(pair: Pair, volume_24h: Decimal) -> Self {
        use rust_decimal_macros::dec;
        Self {
            pair,
            last_price: dec!(100),
            volume_24h,
            high_24h: dec!(105),
            low_24h: dec!(95),
        }
    }
}

/// One OHLCV bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Candles for one pair at one granularity, oldest first.
///
/// Construction sorts by `open_time` and drops duplicate timestamps, so
/// consumers can rely on strictly increasing open times. Gaps are allowed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.open_time);
        candles.dedup_by_key(|c| c.open_time);
        Self { candles }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Number of gaps wider than one `granularity_secs` bucket.
    pub fn gap_count(&self, granularity_secs: u32) -> usize {
        let step = i64::from(granularity_secs);
        self.candles
            .windows(2)
            .filter(|w| (w[1].open_time - w[0].open_time).num_seconds() > step)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Indicators and tags
// ---------------------------------------------------------------------------

/// Indicator values for the latest candle of a series.
/// `None` means there was not enough data (or a zero denominator).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub rsi: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub volatility_ratio: Option<f64>,
}

impl fmt::Display for IndicatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"));
        write!(
            f,
            "RSI: {} | volume: {}x | volatility: {}x",
            show(self.rsi),
            show(self.volume_ratio),
            show(self.volatility_ratio),
        )
    }
}

/// Qualitative opportunity label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    Oversold,
    Overbought,
    HighVolume,
    HighVolatility,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Oversold => "oversold",
            Tag::Overbought => "overbought",
            Tag::HighVolume => "high_volume",
            Tag::HighVolatility => "high_volatility",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type TagSet = BTreeSet<Tag>;

// ---------------------------------------------------------------------------
// Opportunity
// ---------------------------------------------------------------------------

/// A pair flagged by at least one tagging rule in a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub pair: Pair,
    pub stats: PairStats,
    pub indicators: IndicatorSet,
    pub tags: TagSet,
}

impl Opportunity {
    pub fn is_tagged(&self) -> bool {
        !self.tags.is_empty()
    }
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.tags.iter().map(Tag::as_str).collect();
        let tags = if tags.is_empty() {
            "none".to_string()
        } else {
            tags.join(", ")
        };
        write!(
            f,
            "{} | price: ${:.2} | 24h volume: {:.2} | tags: {} | {}",
            self.pair,
            self.stats.last_price,
            self.stats.volume_24h,
            tags,
            self.indicators,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures reported by a `MarketDataSource`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// Transport, auth, rate-limit, or decoding failure. Retryable by the caller.
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The pair is not (or no longer) listed.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Domain-specific error types for SQUEEZE.
#[derive(Debug, thiserror::Error)]
pub enum SqueezeError {
    #[error("Market data source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Insufficient data for {pair}: have {have} candles, need {need}")]
    InsufficientData { pair: Pair, have: usize, need: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<SourceError> for SqueezeError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Unavailable(msg) => SqueezeError::SourceUnavailable(msg),
            SourceError::NotFound(msg) => {
                SqueezeError::SourceUnavailable(format!("not found: {msg}"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

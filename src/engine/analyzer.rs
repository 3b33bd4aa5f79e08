//! Detailed multi-timeframe analysis of a short list of pairs.
//!
//! For each pair: 24h stats, an indicator set on three timeframes
//! (5-minute over a day, hourly over a week, daily over a month), and on the
//! daily series EMA momentum, support/resistance and trend strength. A pair
//! with fewer than `min_candles` candles on any timeframe (capped at that
//! timeframe's lookback) is dropped.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use super::pacer::RequestPacer;
use crate::exchange::MarketDataSource;
use crate::indicators::trend::{self, Momentum, SupportResistance, TrendStrength};
use crate::indicators::{self, IndicatorEngine};
use crate::types::{CandleSeries, IndicatorSet, Pair, SqueezeError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// A candle width and how many candles to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeframe {
    pub label: &'static str,
    pub granularity_secs: u32,
    pub lookback: u32,
}

/// Short, medium and long term, in that order.
pub const TIMEFRAMES: [Timeframe; 3] = [
    Timeframe {
        label: "short-term (24h)",
        granularity_secs: 300,
        lookback: 288,
    },
    Timeframe {
        label: "medium-term (7d)",
        granularity_secs: 3600,
        lookback: 168,
    },
    Timeframe {
        label: "long-term (30d)",
        granularity_secs: 86_400,
        lookback: 30,
    },
];

const EMA_FAST: usize = 20;
const EMA_SLOW: usize = 50;
const SUPPORT_WINDOW: usize = 30;
const TREND_PERIOD: usize = 14;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeMetrics {
    pub label: String,
    pub candles: usize,
    pub indicators: IndicatorSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairAnalysis {
    pub pair: Pair,
    pub current_price: Decimal,
    pub volume_24h: Decimal,
    pub timeframes: Vec<TimeframeMetrics>,
    pub momentum: Option<Momentum>,
    pub levels: Option<SupportResistance>,
    pub trend: Option<TrendStrength>,
}

impl fmt::Display for PairAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} Analysis:", self.pair)?;
        writeln!(f, "Current Price: ${:.2}", self.current_price)?;
        writeln!(f, "24h Volume: {:.2}", self.volume_24h)?;
        for tf in &self.timeframes {
            writeln!(f, "{}: {}", tf.label, tf.indicators)?;
        }
        match &self.momentum {
            Some(m) => writeln!(f, "Momentum: {} (strength: {:.2})", m.direction, m.strength)?,
            None => writeln!(f, "Momentum: n/a")?,
        }
        match &self.trend {
            Some(t) => writeln!(f, "Trend: {} (strength: {:.2})", t.direction, t.strength)?,
            None => writeln!(f, "Trend: n/a")?,
        }
        match &self.levels {
            Some(l) => write!(
                f,
                "Support: ${:.2} | Resistance: ${:.2}",
                l.support, l.resistance
            ),
            None => write!(f, "Support/Resistance: n/a"),
        }
    }
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

pub struct PairAnalyzer {
    engine: IndicatorEngine,
    min_candles: usize,
}

impl PairAnalyzer {
    pub fn new(engine: IndicatorEngine, min_candles: usize) -> Self {
        Self {
            engine,
            min_candles,
        }
    }

    /// Analyze each pair in order. Pairs whose data cannot be fetched are
    /// logged and left out.
    pub async fn analyze_all(
        &self,
        source: &dyn MarketDataSource,
        pacer: &mut RequestPacer,
        pairs: &[Pair],
    ) -> Vec<PairAnalysis> {
        let mut results = Vec::with_capacity(pairs.len());
        for pair in pairs {
            match self.analyze(source, pacer, pair).await {
                Ok(analysis) => results.push(analysis),
                Err(e) => warn!(pair = %pair, error = %e, "Detailed analysis failed, skipping"),
            }
        }
        info!(
            requested = pairs.len(),
            analyzed = results.len(),
            "Detailed analysis complete"
        );
        results
    }

    pub async fn analyze(
        &self,
        source: &dyn MarketDataSource,
        pacer: &mut RequestPacer,
        pair: &Pair,
    ) -> Result<PairAnalysis, SqueezeError> {
        pacer.wait().await;
        let stats = source.get_stats(pair).await?;

        let mut timeframes = Vec::with_capacity(TIMEFRAMES.len());
        let mut long_term = CandleSeries::default();
        for tf in TIMEFRAMES {
            pacer.wait().await;
            let series = source
                .get_candles(pair, tf.granularity_secs, tf.lookback)
                .await?;
            debug!(
                pair = %pair,
                timeframe = tf.label,
                candles = series.len(),
                "Timeframe fetched"
            );
            let need = self.min_candles.min(tf.lookback as usize);
            if series.len() < need {
                return Err(SqueezeError::InsufficientData {
                    pair: pair.clone(),
                    have: series.len(),
                    need,
                });
            }

            timeframes.push(TimeframeMetrics {
                label: tf.label.to_string(),
                candles: series.len(),
                indicators: self.engine.compute(&series),
            });
            long_term = series;
        }

        let bars = indicators::bars(&long_term);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        Ok(PairAnalysis {
            pair: pair.clone(),
            current_price: stats.last_price,
            volume_24h: stats.volume_24h,
            timeframes,
            momentum: trend::momentum(&closes, EMA_FAST, EMA_SLOW),
            levels: trend::support_resistance(&bars, SUPPORT_WINDOW),
            trend: trend::trend_strength(&bars, TREND_PERIOD),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Technical indicators.
//!
//! Pure functions of a candle series: no I/O, no hidden state. The
//! `IndicatorEngine` derives the per-scan `IndicatorSet` (RSI, volume trend
//! ratio, volatility ratio); `trend` holds the longer-horizon measures used
//! by the detailed pair analysis.

pub mod ratios;
pub mod rsi;
pub mod trend;

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::{CandleSeries, IndicatorSet, SqueezeError};

pub use rsi::RsiMethod;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Window lengths for the indicator set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    /// RSI window in closes (default 14).
    pub rsi_period: usize,
    pub rsi_method: RsiMethod,
    /// Candles before the latest averaged for the volume ratio (default 20).
    pub volume_lookback: usize,
    /// Candles before the latest averaged for the volatility ratio (default 20).
    pub volatility_lookback: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_method: RsiMethod::Simple,
            volume_lookback: 20,
            volatility_lookback: 20,
        }
    }
}

impl IndicatorParams {
    pub fn validate(&self) -> Result<(), SqueezeError> {
        for (name, value) in [
            ("rsi_period", self.rsi_period),
            ("volume_lookback", self.volume_lookback),
            ("volatility_lookback", self.volatility_lookback),
        ] {
            if value == 0 {
                return Err(SqueezeError::InvalidConfiguration(format!(
                    "{name} must be positive"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// A candle reduced to the `f64` fields indicator math needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Convert a series to bars. Decimal → f64 conversion cannot fail for
/// exchange-sized values; a value that somehow does reads as zero.
pub fn bars(series: &CandleSeries) -> Vec<Bar> {
    series
        .candles()
        .iter()
        .map(|c| Bar {
            high: c.high.to_f64().unwrap_or(0.0),
            low: c.low.to_f64().unwrap_or(0.0),
            close: c.close.to_f64().unwrap_or(0.0),
            volume: c.volume.to_f64().unwrap_or(0.0),
        })
        .collect()
}

/// Computes the per-pair `IndicatorSet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine {
    params: IndicatorParams,
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Self {
        Self { params }
    }

    /// Indicators for the latest candle of `series`. Each field is
    /// independently `None` when its window lacks data.
    pub fn compute(&self, series: &CandleSeries) -> IndicatorSet {
        self.compute_bars(&bars(series))
    }

    pub fn compute_bars(&self, bars: &[Bar]) -> IndicatorSet {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let ranges: Vec<Option<f64>> = bars
            .iter()
            .map(|b| ratios::range_fraction(b.high, b.low, b.close))
            .collect();

        IndicatorSet {
            rsi: rsi::rsi(&closes, self.params.rsi_period, self.params.rsi_method),
            volume_ratio: ratios::volume_ratio(&volumes, self.params.volume_lookback),
            volatility_ratio: ratios::volatility_ratio(&ranges, self.params.volatility_lookback),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Longer-horizon trend measures used by the detailed pair analysis:
//! EMA crossover momentum, support/resistance bands, and a simplified ADX.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Bar;

/// Direction of a trend reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Bullish,
    Bearish,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Bullish => write!(f, "bullish"),
            TrendDirection::Bearish => write!(f, "bearish"),
        }
    }
}

/// Fast-vs-slow EMA comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Momentum {
    pub direction: TrendDirection,
    /// |fast − slow| / slow, in percent.
    pub strength: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub support: f64,
    pub resistance: f64,
}

/// Directional-movement reading (simplified ADX).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendStrength {
    pub direction: TrendDirection,
    /// |DI+ − DI−|
    pub strength: f64,
}

/// Exponential moving average of `values` with `α = 2 / (span + 1)`,
/// seeded with the first value. Returns the final EMA.
pub fn ema(values: &[f64], span: usize) -> Option<f64> {
    let (first, rest) = values.split_first()?;
    if span == 0 {
        return None;
    }
    let alpha = 2.0 / (span as f64 + 1.0);
    Some(rest.iter().fold(*first, |acc, v| alpha * v + (1.0 - alpha) * acc))
}

/// Compare EMA(`fast`) against EMA(`slow`) of the closes.
pub fn momentum(closes: &[f64], fast: usize, slow: usize) -> Option<Momentum> {
    let fast_ema = ema(closes, fast)?;
    let slow_ema = ema(closes, slow)?;
    if slow_ema == 0.0 {
        return None;
    }
    let direction = if fast_ema > slow_ema {
        TrendDirection::Bullish
    } else {
        TrendDirection::Bearish
    };
    Some(Momentum {
        direction,
        strength: (fast_ema - slow_ema).abs() / slow_ema.abs() * 100.0,
    })
}

/// Support = mean(low) − std(low), resistance = mean(high) + std(high)
/// over the last `window` bars (sample standard deviation).
pub fn support_resistance(bars: &[Bar], window: usize) -> Option<SupportResistance> {
    let recent = &bars[bars.len().saturating_sub(window)..];
    if recent.len() < 2 {
        return None;
    }
    let lows: Vec<f64> = recent.iter().map(|b| b.low).collect();
    let highs: Vec<f64> = recent.iter().map(|b| b.high).collect();
    let (low_mean, low_std) = mean_std(&lows);
    let (high_mean, high_std) = mean_std(&highs);
    Some(SupportResistance {
        support: low_mean - low_std,
        resistance: high_mean + high_std,
    })
}

/// Simplified ADX: averages of true range and directional movement over
/// the trailing `period` steps, compared as DI+ vs DI−.
pub fn trend_strength(bars: &[Bar], period: usize) -> Option<TrendStrength> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }

    let steps: Vec<(f64, f64, f64)> = bars
        .windows(2)
        .map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            let tr = (cur.high - cur.low)
                .max((cur.high - prev.close).abs())
                .max((cur.low - prev.close).abs());
            let up = cur.high - prev.high;
            let down = prev.low - cur.low;
            let dm_plus = if up > down { up.max(0.0) } else { 0.0 };
            let dm_minus = if down > up { down.max(0.0) } else { 0.0 };
            (tr, dm_plus, dm_minus)
        })
        .collect();

    let window = &steps[steps.len() - period..];
    let n = period as f64;
    let tr_avg = window.iter().map(|s| s.0).sum::<f64>() / n;
    if tr_avg <= 0.0 {
        return None;
    }
    let di_plus = window.iter().map(|s| s.1).sum::<f64>() / n / tr_avg * 100.0;
    let di_minus = window.iter().map(|s| s.2).sum::<f64>() / n / tr_avg * 100.0;

    Some(TrendStrength {
        direction: if di_plus > di_minus {
            TrendDirection::Bullish
        } else {
            TrendDirection::Bearish
        },
        strength: (di_plus - di_minus).abs(),
    })
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

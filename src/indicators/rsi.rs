//! Relative Strength Index.

use serde::{Deserialize, Serialize};

/// How average gain/loss are taken over the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiMethod {
    /// Arithmetic mean of the trailing `period` deltas.
    #[default]
    Simple,
    /// Simple-mean seed over the first `period` deltas, then Wilder smoothing
    /// `avg = (avg * (period - 1) + x) / period` through the rest of the series.
    Wilder,
}

/// RSI of the last close in `closes`.
///
/// Returns `None` with fewer than `period + 1` closes or a zero period.
/// A flat window reads 50; a window with gains and no losses reads 100.
pub fn rsi(closes: &[f64], period: usize, method: RsiMethod) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|w| {
            let delta = w[1] - w[0];
            (delta.max(0.0), (-delta).max(0.0))
        })
        .unzip();

    let (avg_gain, avg_loss) = match method {
        RsiMethod::Simple => {
            let start = gains.len() - period;
            (mean(&gains[start..]), mean(&losses[start..]))
        }
        RsiMethod::Wilder => {
            let n = period as f64;
            let mut avg_gain = mean(&gains[..period]);
            let mut avg_loss = mean(&losses[..period]);
            for (g, l) in gains[period..].iter().zip(&losses[period..]) {
                avg_gain = (avg_gain * (n - 1.0) + g) / n;
                avg_loss = (avg_loss * (n - 1.0) + l) / n;
            }
            (avg_gain, avg_loss)
        }
    };

    Some(from_averages(avg_gain, avg_loss))
}

fn from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

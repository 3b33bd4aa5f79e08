//! Volume and volatility ratios: the latest candle against its trailing window.

/// Latest volume divided by the mean volume of the previous `lookback`
/// candles. Uses whatever history exists up to `lookback`.
///
/// `None` if there is no history or the history mean is zero.
pub fn volume_ratio(volumes: &[f64], lookback: usize) -> Option<f64> {
    let (latest, history) = split_latest(volumes, lookback)?;
    ratio(*latest, history.iter().copied())
}

/// Per-candle range fraction `(high - low) / close`. `None` when close is zero.
pub fn range_fraction(high: f64, low: f64, close: f64) -> Option<f64> {
    if close <= 0.0 {
        return None;
    }
    Some(((high - low) / close).max(0.0))
}

/// Latest range fraction divided by the mean range fraction of the previous
/// `lookback` candles. Candles without a range fraction are left out of the
/// mean.
///
/// `None` if the latest candle has no range fraction, no history candle has
/// one, or the history mean is zero.
pub fn volatility_ratio(ranges: &[Option<f64>], lookback: usize) -> Option<f64> {
    let (latest, history) = split_latest(ranges, lookback)?;
    ratio((*latest)?, history.iter().flatten().copied())
}

/// Latest element and up to `lookback` elements before it.
fn split_latest<T>(values: &[T], lookback: usize) -> Option<(&T, &[T])> {
    let (latest, rest) = values.split_last()?;
    let start = rest.len().saturating_sub(lookback);
    Some((latest, &rest[start..]))
}

fn ratio(latest: f64, history: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = history.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        return None;
    }
    let mean = sum / count as f64;
    if mean <= 0.0 || !mean.is_finite() {
        return None;
    }
    Some((latest / mean).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Volume --

    #[test]
    fn test_volume_ratio_basic() {
        let volumes = [10.0, 10.0, 10.0, 30.0];
        assert_eq!(volume_ratio(&volumes, 20), Some(3.0));
    }

    #[test]
    fn test_volume_ratio_respects_lookback() {
        // Only the two candles before the latest count.
        let volumes = [1000.0, 10.0, 30.0, 40.0];
        assert_eq!(volume_ratio(&volumes, 2), Some(2.0));
    }

    #[test]
    fn test_volume_ratio_excludes_latest_from_mean() {
        let volumes = [5.0, 5.0];
        assert_eq!(volume_ratio(&volumes, 1), Some(1.0));
    }

    #[test]
    fn test_volume_ratio_undefined_without_history() {
        assert_eq!(volume_ratio(&[], 20), None);
        assert_eq!(volume_ratio(&[50.0], 20), None);
        assert_eq!(volume_ratio(&[1.0, 2.0], 0), None);
    }

    #[test]
    fn test_volume_ratio_undefined_on_zero_mean() {
        assert_eq!(volume_ratio(&[0.0, 0.0, 0.0, 100.0], 20), None);
    }

    #[test]
    fn test_volume_ratio_zero_latest() {
        assert_eq!(volume_ratio(&[10.0, 10.0, 0.0], 20), Some(0.0));
    }

    // -- Volatility --

    #[test]
    fn test_range_fraction() {
        assert_eq!(range_fraction(110.0, 90.0, 100.0), Some(0.2));
        assert_eq!(range_fraction(1.0, 1.0, 0.0), None);
    }

    #[test]
    fn test_volatility_ratio_basic() {
        let ranges = [Some(0.01), Some(0.01), Some(0.03)];
        let v = volatility_ratio(&ranges, 20).unwrap();
        assert!((v - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_volatility_ratio_skips_undefined_history() {
        let ranges = [None, Some(0.02), Some(0.04)];
        let v = volatility_ratio(&ranges, 20).unwrap();
        assert!((v - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_volatility_ratio_undefined_cases() {
        assert_eq!(volatility_ratio(&[Some(0.1), None], 20), None);
        assert_eq!(volatility_ratio(&[None, None, Some(0.1)], 20), None);
        assert_eq!(volatility_ratio(&[Some(0.0), Some(0.0), Some(0.1)], 20), None);
        assert_eq!(volatility_ratio(&[], 20), None);
    }
}

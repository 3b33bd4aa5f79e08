//! Opportunity classification.
//!
//! Maps an `IndicatorSet` onto qualitative tags using configurable
//! thresholds. An undefined indicator never produces its tag.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::types::{IndicatorSet, SqueezeError, Tag, TagSet};

// ---------------------------------------------------------------------------
// Configuration (defaults — overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

/// Tagging thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// RSI strictly below this is `oversold`; above `100 - rsi_oversold`
    /// is `overbought` when `flag_overbought` is set.
    pub rsi_oversold: f64,
    pub flag_overbought: bool,
    /// Volume ratio at or above this is `high_volume`.
    pub volume_multiplier: f64,
    /// Volatility ratio at or above this is `high_volatility`.
    pub volatility_multiplier: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            flag_overbought: false,
            volume_multiplier: 2.0,
            volatility_multiplier: 1.5,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), SqueezeError> {
        for (name, value) in [
            ("rsi_oversold", self.rsi_oversold),
            ("volume_multiplier", self.volume_multiplier),
            ("volatility_multiplier", self.volatility_multiplier),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SqueezeError::InvalidConfiguration(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if self.rsi_oversold >= 50.0 {
            return Err(SqueezeError::InvalidConfiguration(format!(
                "rsi_oversold must be below 50, got {}",
                self.rsi_oversold
            )));
        }
        Ok(())
    }

    /// Lower bound (exclusive) of the overbought band.
    pub fn rsi_overbought(&self) -> f64 {
        100.0 - self.rsi_oversold
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct OpportunityClassifier {
    thresholds: Thresholds,
}

impl OpportunityClassifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Tags earned by `indicators`. Empty means no opportunity.
    pub fn classify(&self, indicators: &IndicatorSet) -> TagSet {
        let t = &self.thresholds;
        let mut tags = TagSet::new();

        if let Some(rsi) = indicators.rsi {
            if rsi < t.rsi_oversold {
                tags.insert(Tag::Oversold);
            } else if t.flag_overbought && rsi > t.rsi_overbought() {
                tags.insert(Tag::Overbought);
            }
        }

        if indicators
            .volume_ratio
            .is_some_and(|v| v >= t.volume_multiplier)
        {
            tags.insert(Tag::HighVolume);
        }

        if indicators
            .volatility_ratio
            .is_some_and(|v| v >= t.volatility_multiplier)
        {
            tags.insert(Tag::HighVolatility);
        }

        trace!(?indicators, ?tags, "Classified");
        tags
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! key has a default, so a partial (or empty) file is valid. `validate`
//! turns the file into the runtime configs used by the scanner and is the
//! only place `InvalidConfiguration` is raised.

use anyhow::{Context, Result};
use rust_decimal::prelude::*;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::engine::ScanConfig;
use crate::exchange::coinbase::{DEFAULT_BASE_URL, MAX_CANDLES_PER_REQUEST};
use crate::indicators::{IndicatorParams, RsiMethod};
use crate::strategy::Thresholds;
use crate::types::{Pair, SqueezeError};

/// Upper bound for `request_delay_secs`.
const MAX_REQUEST_DELAY_SECS: f64 = 3600.0;
/// Upper bound for the scan interval and timeout (30 days).
const MAX_PERIOD_SECS: u64 = 30 * 86_400;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub exchange: ExchangeConfig,
    pub scanner: ScannerConfig,
    pub indicators: IndicatorsConfig,
    pub thresholds: ThresholdsConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    /// Seconds between scans. Absent means scan once and exit.
    pub scan_interval_secs: Option<u64>,
    /// Per-scan deadline; the scan returns partial results when it passes.
    pub scan_timeout_secs: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "SQUEEZE-001".to_string(),
            scan_interval_secs: None,
            scan_timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScannerConfig {
    pub quote_currency: String,
    pub min_volume: f64,
    pub granularity_secs: u32,
    pub candle_lookback: u32,
    pub min_candles: usize,
    pub request_delay_secs: f64,
    pub report_all: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            quote_currency: "USD".to_string(),
            min_volume: 100_000.0,
            granularity_secs: 3600,
            candle_lookback: 168,
            min_candles: 20,
            request_delay_secs: 0.5,
            report_all: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndicatorsConfig {
    pub rsi_period: usize,
    pub rsi_method: RsiMethod,
    pub volume_lookback: usize,
    pub volatility_lookback: usize,
}

impl Default for IndicatorsConfig {
    fn default() -> Self {
        let params = IndicatorParams::default();
        Self {
            rsi_period: params.rsi_period,
            rsi_method: params.rsi_method,
            volume_lookback: params.volume_lookback,
            volatility_lookback: params.volatility_lookback,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub rsi_oversold: f64,
    pub flag_overbought: bool,
    pub volume_multiplier: f64,
    pub volatility_multiplier: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        let t = Thresholds::default();
        Self {
            rsi_oversold: t.rsi_oversold,
            flag_overbought: t.flag_overbought,
            volume_multiplier: t.volume_multiplier,
            volatility_multiplier: t.volatility_multiplier,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    pub enabled: bool,
    pub recommended_pairs: Vec<String>,
}

/// Validated runtime settings derived from `AppConfig`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub scan: ScanConfig,
    pub indicators: IndicatorParams,
    pub thresholds: Thresholds,
    pub recommended_pairs: Vec<Pair>,
    pub scan_interval: Option<Duration>,
    pub scan_timeout: Option<Duration>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Check every value and build the runtime configs.
    pub fn validate(&self) -> Result<RuntimeConfig, SqueezeError> {
        let invalid = |msg: String| SqueezeError::InvalidConfiguration(msg);

        let s = &self.scanner;
        if !s.min_volume.is_finite() || s.min_volume < 0.0 {
            return Err(invalid(format!("min_volume must be >= 0, got {}", s.min_volume)));
        }
        if !(0.0..=MAX_REQUEST_DELAY_SECS).contains(&s.request_delay_secs) {
            return Err(invalid(format!(
                "request_delay_secs must be within 0..={MAX_REQUEST_DELAY_SECS}, got {}",
                s.request_delay_secs
            )));
        }
        let request_delay = Duration::try_from_secs_f64(s.request_delay_secs)
            .map_err(|e| invalid(format!("request_delay_secs: {e}")))?;
        if s.candle_lookback > MAX_CANDLES_PER_REQUEST {
            return Err(invalid(format!(
                "candle_lookback must not exceed {MAX_CANDLES_PER_REQUEST}, got {}",
                s.candle_lookback
            )));
        }
        let min_volume = Decimal::from_f64(s.min_volume)
            .ok_or_else(|| invalid(format!("min_volume out of range: {}", s.min_volume)))?;

        let scan = ScanConfig {
            quote_currency: s.quote_currency.trim().to_uppercase(),
            min_volume,
            granularity_secs: s.granularity_secs,
            candle_lookback: s.candle_lookback,
            min_candles: s.min_candles,
            request_delay,
            report_all: s.report_all,
        };
        scan.validate()?;

        let indicators = IndicatorParams {
            rsi_period: self.indicators.rsi_period,
            rsi_method: self.indicators.rsi_method,
            volume_lookback: self.indicators.volume_lookback,
            volatility_lookback: self.indicators.volatility_lookback,
        };
        indicators.validate()?;

        let thresholds = Thresholds {
            rsi_oversold: self.thresholds.rsi_oversold,
            flag_overbought: self.thresholds.flag_overbought,
            volume_multiplier: self.thresholds.volume_multiplier,
            volatility_multiplier: self.thresholds.volatility_multiplier,
        };
        thresholds.validate()?;

        let recommended_pairs = self
            .analysis
            .recommended_pairs
            .iter()
            .map(|p| p.parse::<Pair>())
            .collect::<Result<Vec<_>, _>>()?;

        if self.exchange.timeout_secs == 0 {
            return Err(invalid("exchange.timeout_secs must be positive".to_string()));
        }

        let period_secs = |name: &str, v: Option<u64>| match v {
            Some(0) => Err(invalid(format!("{name} must be positive"))),
            Some(secs) if secs > MAX_PERIOD_SECS => Err(invalid(format!(
                "{name} must not exceed {MAX_PERIOD_SECS}, got {secs}"
            ))),
            other => Ok(other.map(Duration::from_secs)),
        };

        Ok(RuntimeConfig {
            scan,
            indicators,
            thresholds,
            recommended_pairs,
            scan_interval: period_secs("scan_interval_secs", self.agent.scan_interval_secs)?,
            scan_timeout: period_secs("scan_timeout_secs", self.agent.scan_timeout_secs)?,
        })
    }
}

//! Market scanner.
//!
//! Walks the exchange's pair universe: filters by quote currency and 24h
//! volume, fetches candles for the survivors, runs the indicator engine
//! and the classifier, and collects tagged pairs as opportunities. Every
//! source call goes through the scanner's `RequestPacer`.
//!
//! Failure policy: only the product list is fatal. Anything that goes
//! wrong for a single pair is logged, recorded as a skip, and the scan
//! moves on.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::pacer::RequestPacer;
use crate::exchange::MarketDataSource;
use crate::indicators::IndicatorEngine;
use crate::strategy::OpportunityClassifier;
use crate::types::{Opportunity, Pair, SourceError, SqueezeError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Scan-level settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Only pairs quoted in this currency are scanned.
    pub quote_currency: String,
    /// Pairs with less 24h volume are dropped before candles are fetched.
    pub min_volume: Decimal,
    /// Candle width in seconds.
    pub granularity_secs: u32,
    /// Candles requested per pair.
    pub candle_lookback: u32,
    /// Shorter series are skipped as insufficient data.
    pub min_candles: usize,
    /// Minimum gap between successive source calls.
    pub request_delay: Duration,
    /// Emit untagged pairs too.
    pub report_all: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            quote_currency: "USD".to_string(),
            min_volume: dec!(100000),
            granularity_secs: 3600,
            candle_lookback: 168,
            min_candles: 20,
            request_delay: Duration::from_millis(500),
            report_all: false,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), SqueezeError> {
        let invalid = |msg: &str| Err(SqueezeError::InvalidConfiguration(msg.to_string()));

        if self.quote_currency.trim().is_empty() {
            return invalid("quote_currency must not be empty");
        }
        if self.min_volume.is_sign_negative() {
            return invalid("min_volume must not be negative");
        }
        if self.granularity_secs == 0 {
            return invalid("granularity_secs must be positive");
        }
        if self.candle_lookback == 0 {
            return invalid("candle_lookback must be positive");
        }
        if self.min_candles < 2 {
            return invalid("min_candles must be at least 2");
        }
        if self.min_candles > self.candle_lookback as usize {
            return invalid("min_candles must not exceed candle_lookback");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Why a pair produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    StatsUnavailable,
    NotFound,
    CandlesUnavailable,
    InsufficientData,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::StatsUnavailable => write!(f, "stats_unavailable"),
            SkipReason::NotFound => write!(f, "not_found"),
            SkipReason::CandlesUnavailable => write!(f, "candles_unavailable"),
            SkipReason::InsufficientData => write!(f, "insufficient_data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPair {
    pub pair: Pair,
    pub reason: SkipReason,
    pub detail: String,
}

/// Result of one scan: the opportunities plus an account of everything
/// that was filtered or skipped along the way.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanReport {
    /// In source listing order.
    pub opportunities: Vec<Opportunity>,
    pub pairs_listed: usize,
    /// Pairs left after the quote-currency filter.
    pub pairs_quoted: usize,
    pub pairs_below_volume: usize,
    /// Pairs that reached the indicator engine.
    pub pairs_analyzed: usize,
    pub skipped: Vec<SkippedPair>,
    /// The deadline stopped the scan before every pair was visited.
    pub timed_out: bool,
}

impl ScanReport {
    pub fn skip_counts(&self) -> BTreeMap<SkipReason, usize> {
        let mut counts = BTreeMap::new();
        for s in &self.skipped {
            *counts.entry(s.reason).or_insert(0) += 1;
        }
        counts
    }

    pub fn tagged(&self) -> impl Iterator<Item = &Opportunity> {
        self.opportunities.iter().filter(|o| o.is_tagged())
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "listed: {} | quoted: {} | below volume: {} | analyzed: {} | opportunities: {} | skipped: {}",
            self.pairs_listed,
            self.pairs_quoted,
            self.pairs_below_volume,
            self.pairs_analyzed,
            self.tagged().count(),
            self.skipped.len(),
        )?;
        let counts = self.skip_counts();
        if !counts.is_empty() {
            let parts: Vec<String> = counts.iter().map(|(r, n)| format!("{r}={n}")).collect();
            write!(f, " ({})", parts.join(", "))?;
        }
        if self.timed_out {
            write!(f, " | timed out")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

enum PairOutcome {
    BelowVolume,
    Skipped(SkippedPair),
    Analyzed(Opportunity),
    DeadlineReached,
}

pub struct Scanner {
    config: ScanConfig,
    engine: IndicatorEngine,
    classifier: OpportunityClassifier,
    pacer: RequestPacer,
}

impl Scanner {
    pub fn new(
        config: ScanConfig,
        engine: IndicatorEngine,
        classifier: OpportunityClassifier,
    ) -> Self {
        let pacer = RequestPacer::new(config.request_delay);
        Self {
            config,
            engine,
            classifier,
            pacer,
        }
    }

    /// The scanner's pacer, for other callers that share its rate limit.
    pub fn pacer_mut(&mut self) -> &mut RequestPacer {
        &mut self.pacer
    }

    /// Scan the full universe with no deadline.
    pub async fn scan(
        &mut self,
        source: &dyn MarketDataSource,
    ) -> Result<ScanReport, SqueezeError> {
        self.scan_until(source, None).await
    }

    /// Scan, stopping new per-pair work once `deadline` is reached. A
    /// deadline yields a partial report with `timed_out` set, never an error.
    pub async fn scan_until(
        &mut self,
        source: &dyn MarketDataSource,
        deadline: Option<Instant>,
    ) -> Result<ScanReport, SqueezeError> {
        info!(
            quote = %self.config.quote_currency,
            min_volume = %self.config.min_volume,
            granularity_secs = self.config.granularity_secs,
            "Starting market scan..."
        );

        self.pacer.wait().await;
        let products = source
            .list_products()
            .await
            .map_err(SqueezeError::from)?;

        let mut report = ScanReport {
            pairs_listed: products.len(),
            ..ScanReport::default()
        };

        let quoted: Vec<Pair> = products
            .into_iter()
            .filter(|p| p.is_quoted_in(&self.config.quote_currency))
            .collect();
        report.pairs_quoted = quoted.len();

        info!(
            listed = report.pairs_listed,
            quoted = report.pairs_quoted,
            "Products fetched"
        );

        for pair in &quoted {
            match self.scan_pair(source, pair, deadline).await {
                PairOutcome::BelowVolume => report.pairs_below_volume += 1,
                PairOutcome::Skipped(skip) => {
                    warn!(
                        pair = %skip.pair,
                        reason = %skip.reason,
                        detail = %skip.detail,
                        "Skipping pair"
                    );
                    report.skipped.push(skip);
                }
                PairOutcome::Analyzed(opportunity) => {
                    report.pairs_analyzed += 1;
                    if opportunity.is_tagged() || self.config.report_all {
                        if opportunity.is_tagged() {
                            info!(
                                pair = %opportunity.pair,
                                tags = ?opportunity.tags,
                                "Found opportunity"
                            );
                        }
                        report.opportunities.push(opportunity);
                    }
                }
                PairOutcome::DeadlineReached => {
                    warn!(pair = %pair, "Scan deadline reached, returning partial results");
                    report.timed_out = true;
                    break;
                }
            }
        }

        info!(summary = %report, "Market scan complete");
        Ok(report)
    }

    async fn scan_pair(
        &mut self,
        source: &dyn MarketDataSource,
        pair: &Pair,
        deadline: Option<Instant>,
    ) -> PairOutcome {
        let skip = |reason: SkipReason, detail: String| {
            PairOutcome::Skipped(SkippedPair {
                pair: pair.clone(),
                reason,
                detail,
            })
        };

        // 1. 24h stats and the volume gate
        if self.past_deadline(deadline) {
            return PairOutcome::DeadlineReached;
        }
        self.pacer.wait().await;
        let stats = match source.get_stats(pair).await {
            Ok(stats) => stats,
            Err(SourceError::NotFound(detail)) => return skip(SkipReason::NotFound, detail),
            Err(e) => return skip(SkipReason::StatsUnavailable, e.to_string()),
        };

        if stats.volume_24h < self.config.min_volume {
            debug!(pair = %pair, volume = %stats.volume_24h, "Skipping - insufficient volume");
            return PairOutcome::BelowVolume;
        }

        // 2. Candle history
        if self.past_deadline(deadline) {
            return PairOutcome::DeadlineReached;
        }
        self.pacer.wait().await;
        let series = match source
            .get_candles(pair, self.config.granularity_secs, self.config.candle_lookback)
            .await
        {
            Ok(series) => series,
            Err(SourceError::NotFound(detail)) => return skip(SkipReason::NotFound, detail),
            Err(e) => return skip(SkipReason::CandlesUnavailable, e.to_string()),
        };

        if series.len() < self.config.min_candles {
            let err = SqueezeError::InsufficientData {
                pair: pair.clone(),
                have: series.len(),
                need: self.config.min_candles,
            };
            return skip(SkipReason::InsufficientData, err.to_string());
        }

        let gaps = series.gap_count(self.config.granularity_secs);
        if gaps > 0 {
            debug!(pair = %pair, gaps, "Candle series has gaps");
        }

        // 3. Indicators → tags
        let indicators = self.engine.compute(&series);
        let tags = self.classifier.classify(&indicators);

        debug!(
            pair = %pair,
            volume = %stats.volume_24h,
            rsi = ?indicators.rsi,
            volume_ratio = ?indicators.volume_ratio,
            volatility_ratio = ?indicators.volatility_ratio,
            "Pair analyzed"
        );

        PairOutcome::Analyzed(Opportunity {
            pair: pair.clone(),
            stats,
            indicators,
            tags,
        })
    }

    /// True when the next request could not start before `deadline`.
    fn past_deadline(&self, deadline: Option<Instant>) -> bool {
        deadline.is_some_and(|d| self.pacer.next_slot().max(Instant::now()) >= d)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

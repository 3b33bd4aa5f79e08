//! End-to-end scans through `Scanner` with the in-memory source.

use rust_decimal_macros::dec;
use std::time::Duration;
use tokio::time::Instant;

use squeeze::engine::{ScanConfig, Scanner, SkipReason};
use squeeze::indicators::{IndicatorEngine, IndicatorParams};
use squeeze::strategy::{OpportunityClassifier, Thresholds};
use squeeze::types::{CandleSeries, Pair, SourceError, SqueezeError, Tag};

use crate::mock_source::{flat, hourly_series, ramp, Call, MockSource};

fn config() -> ScanConfig {
    ScanConfig {
        request_delay: Duration::ZERO,
        ..ScanConfig::default()
    }
}

fn scanner_with(config: ScanConfig, thresholds: Thresholds) -> Scanner {
    Scanner::new(
        config,
        IndicatorEngine::new(IndicatorParams::default()),
        OpportunityClassifier::new(thresholds),
    )
}

fn scanner() -> Scanner {
    scanner_with(config(), Thresholds::default())
}

/// Five USD pairs and one EUR pair with varied behaviour.
fn market() -> MockSource {
    MockSource::new()
        .with_pair("BTC-USD", dec!(900000), &ramp(30000, -10, 40))
        .with_pair("ETH-USD", dec!(500000), &ramp(2000, 5, 40))
        .with_pair("BTC-EUR", dec!(800000), &ramp(28000, -10, 40))
        .with_pair("DOGE-USD", dec!(50000), &ramp(100, -1, 40))
        .with_pair("SOL-USD", dec!(300000), &ramp(150, -1, 40))
        .with_pair("ADA-USD", dec!(200000), &flat(50, 40))
}

#[tokio::test]
async fn test_scan_finds_oversold_pairs_in_listing_order() {
    let source = market();
    let report = scanner().scan(&source).await.unwrap();

    let ids: Vec<String> = report.opportunities.iter().map(|o| o.pair.id()).collect();
    assert_eq!(ids, vec!["BTC-USD", "SOL-USD"]);
    for opp in &report.opportunities {
        assert_eq!(opp.indicators.rsi, Some(0.0));
        assert!(opp.tags.contains(&Tag::Oversold));
    }

    assert_eq!(report.pairs_listed, 6);
    assert_eq!(report.pairs_quoted, 5);
    assert_eq!(report.pairs_below_volume, 1);
    assert_eq!(report.pairs_analyzed, 4);
    assert!(report.skipped.is_empty());
    assert!(!report.timed_out);
}

#[tokio::test]
async fn test_low_volume_pair_excluded_before_candles() {
    let source = market();
    scanner().scan(&source).await.unwrap();

    let doge = Pair::new("DOGE", "USD");
    let calls = source.calls();
    assert!(calls.contains(&(Call::Stats, Some(doge.clone()))));
    assert!(!calls.contains(&(Call::Candles, Some(doge))));
    assert!(!calls.iter().any(|(_, p)| p.as_ref().is_some_and(|p| p.quote == "EUR")));
}

#[tokio::test]
async fn test_fifteen_falling_closes_oversold() {
    let source = MockSource::new().with_pair("XRP-USD", dec!(150000), &ramp(100, -1, 15));
    let mut scanner = scanner_with(
        ScanConfig {
            min_candles: 15,
            ..config()
        },
        Thresholds::default(),
    );

    let report = scanner.scan(&source).await.unwrap();
    assert_eq!(report.opportunities.len(), 1);
    assert_eq!(report.opportunities[0].indicators.rsi, Some(0.0));
    assert!(report.opportunities[0].tags.contains(&Tag::Oversold));
}

#[tokio::test]
async fn test_three_candles_never_rsi_tagged() {
    let source = MockSource::new()
        .with_pair("UP-USD", dec!(150000), &ramp(100, 10, 3))
        .with_pair("DOWN-USD", dec!(150000), &ramp(100, -10, 3));
    let mut scanner = scanner_with(
        ScanConfig {
            min_candles: 2,
            report_all: true,
            ..config()
        },
        Thresholds {
            flag_overbought: true,
            ..Thresholds::default()
        },
    );

    let report = scanner.scan(&source).await.unwrap();
    assert_eq!(report.opportunities.len(), 2);
    for opp in &report.opportunities {
        assert!(opp.indicators.rsi.is_none());
        assert!(!opp.tags.contains(&Tag::Oversold));
        assert!(!opp.tags.contains(&Tag::Overbought));
    }
}

#[tokio::test]
async fn test_short_series_skipped_as_insufficient() {
    let source = MockSource::new().with_pair("NEW-USD", dec!(150000), &ramp(100, -1, 5));
    let report = scanner().scan(&source).await.unwrap();

    assert!(report.opportunities.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, SkipReason::InsufficientData);
    assert!(report.skipped[0].detail.contains("have 5 candles, need 20"));
}

#[tokio::test]
async fn test_partial_failure_keeps_other_pairs() {
    let source = market();
    source.fail_candles("BTC-USD", SourceError::Unavailable("503".into()));
    source.fail_stats("ETH-USD", SourceError::NotFound("ETH-USD".into()));

    let report = scanner().scan(&source).await.unwrap();

    let ids: Vec<String> = report.opportunities.iter().map(|o| o.pair.id()).collect();
    assert_eq!(ids, vec!["SOL-USD"]);

    let counts = report.skip_counts();
    assert_eq!(counts.get(&SkipReason::CandlesUnavailable), Some(&1));
    assert_eq!(counts.get(&SkipReason::NotFound), Some(&1));
    let summary = report.to_string();
    assert!(summary.contains("skipped: 2"), "{summary}");
}

#[tokio::test]
async fn test_product_list_failure_surfaces() {
    let source = market();
    source.fail_listing(SourceError::Unavailable("dns failure".into()));

    let err = scanner().scan(&source).await.unwrap_err();
    assert!(matches!(err, SqueezeError::SourceUnavailable(_)));
    assert_eq!(source.count(Call::Stats), 0);
}

#[tokio::test]
async fn test_identical_snapshots_identical_results() {
    let source = market();
    let mut scanner = scanner();
    let first = scanner.scan(&source).await.unwrap();
    let second = scanner.scan(&source).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_volume_spike_tagged() {
    let mut series = hourly_series(&flat(10, 30)).candles().to_vec();
    if let Some(last) = series.last_mut() {
        last.volume = dec!(450);
    }
    let source = MockSource::new()
        .with_pair("LINK-USD", dec!(400000), &flat(10, 30))
        .with_series("LINK-USD", CandleSeries::new(series));

    let report = scanner().scan(&source).await.unwrap();
    assert_eq!(report.opportunities.len(), 1);
    let opp = &report.opportunities[0];
    assert_eq!(opp.indicators.volume_ratio, Some(4.5));
    assert_eq!(opp.tags, [Tag::HighVolume].into_iter().collect());
}

#[tokio::test]
async fn test_requests_are_paced() {
    let source = MockSource::new()
        .with_pair("AAA-USD", dec!(150000), &ramp(100, -1, 30))
        .with_pair("BBB-USD", dec!(150000), &ramp(100, -1, 30));
    let mut scanner = scanner_with(
        ScanConfig {
            request_delay: Duration::from_millis(25),
            ..config()
        },
        Thresholds::default(),
    );

    let start = Instant::now();
    scanner.scan(&source).await.unwrap();
    let elapsed = start.elapsed();

    // list + 2 × (stats + candles) = 5 requests, 4 gaps
    assert_eq!(source.calls().len(), 5);
    assert!(elapsed >= Duration::from_millis(100), "{elapsed:?}");
}

#[tokio::test]
async fn test_deadline_returns_partial_results() {
    let mut source = MockSource::new();
    for base in ["AAA", "BBB", "CCC", "DDD", "EEE"] {
        source = source.with_pair(&format!("{base}-USD"), dec!(150000), &ramp(100, -1, 30));
    }
    let mut scanner = scanner_with(
        ScanConfig {
            request_delay: Duration::from_millis(100),
            ..config()
        },
        Thresholds::default(),
    );

    let deadline = Instant::now() + Duration::from_millis(250);
    let report = scanner.scan_until(&source, Some(deadline)).await.unwrap();

    assert!(report.timed_out);
    assert_eq!(report.opportunities.len(), 1);
    assert_eq!(report.opportunities[0].pair, Pair::new("AAA", "USD"));
    assert!(source.count(Call::Stats) < 5);
}

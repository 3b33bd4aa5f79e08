//! SQUEEZE — crypto market opportunity scanner
//!
//! Entry point. Loads configuration, initialises structured logging, and
//! runs the scan once or on an interval with graceful shutdown. Results
//! are printed; nothing is persisted and no orders are ever placed.

use anyhow::{Context, Result};
use tokio::time::Instant;
use tracing::{error, info};

use squeeze::config::{self, RuntimeConfig};
use squeeze::engine::analyzer::{PairAnalysis, PairAnalyzer};
use squeeze::engine::{ScanReport, Scanner};
use squeeze::exchange::coinbase::CoinbaseClient;
use squeeze::exchange::MarketDataSource;
use squeeze::indicators::IndicatorEngine;
use squeeze::strategy::OpportunityClassifier;

const BANNER: &str = r#"
 ____   ___  _   _ _____ _____ __________
/ ___| / _ \| | | | ____| ____|__  / ____|
\___ \| | | | | | |  _| |  _|   / /|  _|
 ___) | |_| | |_| | |___| |___ / /_| |___
|____/ \__\_\\___/|_____|_____/____|_____|

  Crypto market opportunity scanner
  v0.1.0 — read-only, never trades
"#;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("SQUEEZE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::AppConfig::load(&config_path)?;
    let runtime = cfg.validate().context("Invalid configuration")?;

    init_logging();

    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        quote = %runtime.scan.quote_currency,
        min_volume = %runtime.scan.min_volume,
        interval_secs = ?runtime.scan_interval.map(|d| d.as_secs()),
        "SQUEEZE starting up"
    );

    // -- Initialise components -------------------------------------------

    let source =
        CoinbaseClient::new(Some(cfg.exchange.base_url.clone()), cfg.exchange.timeout_secs)?;
    let engine = IndicatorEngine::new(runtime.indicators);
    let mut scanner = Scanner::new(
        runtime.scan.clone(),
        engine,
        OpportunityClassifier::new(runtime.thresholds),
    );
    let analyzer = cfg
        .analysis
        .enabled
        .then(|| PairAnalyzer::new(engine, runtime.scan.min_candles));

    // -- Main loop -------------------------------------------------------

    let Some(scan_interval) = runtime.scan_interval else {
        run_cycle(&mut scanner, analyzer.as_ref(), &source, &runtime).await?;
        return Ok(());
    };

    let mut interval = tokio::time::interval(scan_interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = scan_interval.as_secs(),
        "Entering main loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let cycle = run_cycle(&mut scanner, analyzer.as_ref(), &source, &runtime);
                if let Err(e) = cycle.await {
                    error!(error = %e, "Scan failed — continuing to next");
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!("SQUEEZE shut down cleanly.");
    Ok(())
}

/// Run one scan (and the detailed analysis when enabled) and print the results.
async fn run_cycle(
    scanner: &mut Scanner,
    analyzer: Option<&PairAnalyzer>,
    source: &dyn MarketDataSource,
    runtime: &RuntimeConfig,
) -> Result<()> {
    info!(source = source.name(), "Starting market analysis...");

    let deadline = runtime.scan_timeout.and_then(|t| Instant::now().checked_add(t));
    let report = scanner
        .scan_until(source, deadline)
        .await
        .context("Market scan failed")?;
    print_report(&report);

    if let Some(analyzer) = analyzer {
        if !runtime.recommended_pairs.is_empty() {
            println!("\nAnalyzing recommended pairs...");
            let analyses = analyzer
                .analyze_all(source, scanner.pacer_mut(), &runtime.recommended_pairs)
                .await;
            print_analyses(&analyses);
        }
    }

    Ok(())
}

fn print_report(report: &ScanReport) {
    let found: Vec<_> = report.tagged().collect();
    if found.is_empty() {
        println!("\nNo market opportunities found.");
    } else {
        println!("\nFound {} market opportunities:", found.len());
    }
    for opp in &report.opportunities {
        println!("{opp}");
    }
    for skip in &report.skipped {
        println!("skipped {} ({}): {}", skip.pair, skip.reason, skip.detail);
    }
    println!("{}", "-".repeat(50));
    println!("{report}");
}

fn print_analyses(analyses: &[PairAnalysis]) {
    if analyses.is_empty() {
        println!("\nNo detailed analysis available for recommended pairs.");
        return;
    }
    for analysis in analyses {
        println!("\n{analysis}");
        println!("{}", "-".repeat(50));
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("squeeze=info"));

    let json_logging = std::env::var("SQUEEZE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

//! Exchange market-data integrations.
//!
//! Defines the `MarketDataSource` trait consumed by the scanner and provides
//! an implementation for:
//! - Coinbase Exchange: public REST endpoints, no authentication

pub mod coinbase;

use async_trait::async_trait;

use crate::types::{CandleSeries, Pair, PairStats, SourceError};

/// Abstraction over an exchange's public market data.
///
/// Implementors perform the network I/O. Rate limiting is the caller's
/// job: the scanner paces every call it makes through this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// List every tradable pair, in the exchange's own order.
    async fn list_products(&self) -> Result<Vec<Pair>, SourceError>;

    /// Fetch 24-hour statistics for a pair.
    async fn get_stats(&self, pair: &Pair) -> Result<PairStats, SourceError>;

    /// Fetch up to `lookback_count` candles of `granularity_secs` width,
    /// ending now. A shorter series is not an error.
    async fn get_candles(
        &self,
        pair: &Pair,
        granularity_secs: u32,
        lookback_count: u32,
    ) -> Result<CandleSeries, SourceError>;

    /// Source name for logging and identification.
    fn name(&self) -> &str;
}

//! Request pacing.
//!
//! A fixed minimum delay between successive calls to the market-data
//! source. The pacer is owned by the scanner and threaded through every
//! call it makes, so the rate-limit clock has exactly one owner.

use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug)]
pub struct RequestPacer {
    min_interval: Duration,
    last_request: Option<Instant>,
    requests: u64,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
            requests: 0,
        }
    }

    /// Requests admitted so far.
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// When the next request may go out.
    pub fn next_slot(&self) -> Instant {
        match self.last_request {
            Some(last) => last + self.min_interval,
            None => Instant::now(),
        }
    }

    /// Wait until `min_interval` has passed since the previous request,
    /// then record a new one. The first request is never delayed.
    pub async fn wait(&mut self) {
        let slot = self.next_slot();
        if slot > Instant::now() {
            let delay = slot.saturating_duration_since(Instant::now());
            trace!(delay_ms = delay.as_millis() as u64, "Pacing request");
            tokio::time::sleep_until(slot).await;
        }
        self.last_request = Some(Instant::now());
        self.requests += 1;
    }
}

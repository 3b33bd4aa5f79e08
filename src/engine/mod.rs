//! Core engine: the paced scan pipeline and the detailed pair analysis.

pub mod analyzer;
pub mod pacer;
pub mod scanner;

pub use pacer::RequestPacer;
pub use scanner::{ScanConfig, ScanReport, Scanner, SkipReason};

//! Strategy: threshold rules that turn indicator readings into tags.

pub mod classifier;

pub use classifier::{OpportunityClassifier, Thresholds};

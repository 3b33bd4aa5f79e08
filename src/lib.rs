//! SQUEEZE — crypto market opportunity scanner
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod exchange;
pub mod indicators;
pub mod strategy;
pub mod engine;

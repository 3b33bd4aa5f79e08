//! Integration tests: full scans against a deterministic in-memory source.

mod mock_source;
mod scan;

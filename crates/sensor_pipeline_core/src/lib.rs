//! Shared sensor pipeline domain primitives.
//!
//! This crate owns record contracts and the pure decision logic used by the
//! Lambda handlers (threshold classification, alert severity and messages,
//! notification gates, API metrics). It intentionally excludes AWS SDK and
//! Lambda runtime concerns.

pub mod alerting;
pub mod contract;
pub mod inference;
pub mod metrics;
pub mod storage_keys;
pub mod thresholds;

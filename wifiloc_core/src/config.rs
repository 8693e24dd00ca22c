//! Runtime configuration for the localization engine.
//!
//! These are the structs used by `Tracker` and the matcher. They are
//! separate from the TOML-deserialized config in `wifiloc_config`.

use std::time::Duration;

/// KNN matcher parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct KnnCfg {
    /// Number of nearest fingerprints combined into the estimate.
    pub k: usize,
    /// Added to each distance before inversion so an exact match stays finite.
    pub epsilon: f64,
    /// Strength substituted for a network missing from one side (dBm).
    pub sentinel_dbm: i32,
}

impl Default for KnnCfg {
    fn default() -> Self {
        Self {
            k: 3,
            epsilon: 0.01,
            sentinel_dbm: crate::distance::SENTINEL_DBM,
        }
    }
}

/// Scan timer parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerCfg {
    /// Time between tick starts.
    pub period: Duration,
    /// Upper bound handed to the scan source for each scan.
    pub scan_timeout: Duration,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(5),
            scan_timeout: Duration::from_secs(15),
        }
    }
}

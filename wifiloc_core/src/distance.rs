//! Signature dissimilarity.
//!
//! Euclidean norm over the union of network names. A network missing from
//! one side (or seen without a strength) counts as the sentinel strength, so
//! "not seen" reads as maximally attenuated rather than being skipped.

use crate::types::SignalReading;
use std::collections::HashMap;

/// Strength assumed for a network absent from one of the two signatures.
pub const SENTINEL_DBM: i32 = -100;

/// Distance between two reading sequences using [`SENTINEL_DBM`].
pub fn distance(a: &[SignalReading], b: &[SignalReading]) -> f64 {
    distance_with_sentinel(a, b, SENTINEL_DBM)
}

/// Distance between two reading sequences with an explicit sentinel.
///
/// Later readings for a repeated name override earlier ones on each side.
pub fn distance_with_sentinel(a: &[SignalReading], b: &[SignalReading], sentinel: i32) -> f64 {
    let ma = strength_map(a);
    let mb = strength_map(b);

    let mut sum = 0.0f64;
    for name in ma.keys().chain(mb.keys().filter(|k| !ma.contains_key(*k))) {
        let sa = ma.get(name).copied().flatten().unwrap_or(sentinel);
        let sb = mb.get(name).copied().flatten().unwrap_or(sentinel);
        let d = f64::from(sa) - f64::from(sb);
        sum += d * d;
    }
    sum.sqrt()
}

fn strength_map(readings: &[SignalReading]) -> HashMap<&str, Option<i32>> {
    readings
        .iter()
        .map(|r| (r.network_name.as_str(), r.signal_strength))
        .collect()
}

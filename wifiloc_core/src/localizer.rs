//! K-nearest-neighbor fingerprint matcher.
//!
//! Distances from the live readings to every fingerprint are sorted
//! ascending (stable, so ties keep recording order), the first `k` are kept,
//! and the estimate is their inverse-distance weighted centroid with each
//! axis rounded independently.

use crate::config::KnnCfg;
use crate::distance::distance_with_sentinel;
use crate::types::{Fingerprint, Position, SignalReading};

/// One scored fingerprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: Position,
    pub distance: f64,
}

/// Score every fingerprint and return the `k` nearest, closest first.
pub fn nearest(live: &[SignalReading], fingerprints: &[Fingerprint], cfg: &KnnCfg) -> Vec<Neighbor> {
    let mut scored: Vec<Neighbor> = fingerprints
        .iter()
        .map(|fp| Neighbor {
            position: fp.position(),
            distance: distance_with_sentinel(live, fp.readings(), cfg.sentinel_dbm),
        })
        .collect();
    scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    scored.truncate(cfg.k.min(scored.len()));
    scored
}

/// Estimate a position from the live readings.
///
/// Returns `None` when there is nothing to match (no fingerprints, or no
/// live reading with a resolved strength). A degenerate zero total weight
/// yields `current` unchanged.
pub fn localize(
    live: &[SignalReading],
    fingerprints: &[Fingerprint],
    cfg: &KnnCfg,
    current: Position,
) -> Option<Position> {
    let live: Vec<SignalReading> = live
        .iter()
        .filter(|r| r.signal_strength.is_some())
        .cloned()
        .collect();
    if fingerprints.is_empty() || live.is_empty() {
        return None;
    }

    let neighbors = nearest(&live, fingerprints, cfg);
    if neighbors.is_empty() {
        return None;
    }
    tracing::trace!(?neighbors, "nearest fingerprints");
    Some(weighted_centroid(&neighbors, cfg.epsilon).unwrap_or(current))
}

/// Inverse-distance weighted centroid; `None` if the total weight is not
/// a positive finite number.
pub fn weighted_centroid(neighbors: &[Neighbor], epsilon: f64) -> Option<Position> {
    let mut sx = 0.0f64;
    let mut sy = 0.0f64;
    let mut total = 0.0f64;
    for n in neighbors {
        let w = 1.0 / (n.distance + epsilon);
        sx += n.position.x as f64 * w;
        sy += n.position.y as f64 * w;
        total += w;
    }
    if !(total.is_finite() && total > 0.0) {
        return None;
    }
    Some(Position::new(round_half_up(sx / total), round_half_up(sy / total)))
}

/// Round to nearest, halves toward positive infinity (`-2.5 -> -2`).
#[inline]
fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

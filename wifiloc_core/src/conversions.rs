//! `From` implementations bridging `wifiloc_config` types to `wifiloc_core` types.

use crate::config::{KnnCfg, SchedulerCfg};
use crate::mode::Mode;
use crate::types::{Fingerprint, Position, SignalReading};
use std::time::Duration;

// ── KnnCfg ───────────────────────────────────────────────────────────────────

impl From<&wifiloc_config::KnnCfg> for KnnCfg {
    fn from(c: &wifiloc_config::KnnCfg) -> Self {
        Self {
            k: c.k,
            epsilon: c.epsilon,
            sentinel_dbm: c.sentinel_dbm,
        }
    }
}

// ── SchedulerCfg ─────────────────────────────────────────────────────────────

impl From<&wifiloc_config::Config> for SchedulerCfg {
    fn from(c: &wifiloc_config::Config) -> Self {
        Self {
            period: Duration::from_millis(c.scheduler.period_ms),
            scan_timeout: Duration::from_millis(c.scan.timeout_ms),
        }
    }
}

// ── Mode / Position ──────────────────────────────────────────────────────────

impl From<wifiloc_config::InitialMode> for Mode {
    fn from(m: wifiloc_config::InitialMode) -> Self {
        match m {
            wifiloc_config::InitialMode::Idle => Mode::Idle,
            wifiloc_config::InitialMode::Calibrating => Mode::Calibrating,
            wifiloc_config::InitialMode::Tracking => Mode::Tracking,
        }
    }
}

impl From<wifiloc_config::PositionCfg> for Position {
    fn from(p: wifiloc_config::PositionCfg) -> Self {
        Position::new(p.x, p.y)
    }
}

// ── Seed fingerprints ────────────────────────────────────────────────────────

impl From<wifiloc_config::SeedFingerprint> for Fingerprint {
    fn from(seed: wifiloc_config::SeedFingerprint) -> Self {
        Fingerprint::new(
            Position::new(seed.x, seed.y),
            chrono::Utc::now(),
            seed.readings
                .into_iter()
                .map(|(name, rssi)| SignalReading::resolved(name, rssi))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_cfg_from_config() {
        let cfg = wifiloc_config::load_toml("[scheduler]\nperiod_ms = 250\n[scan]\ntimeout_ms = 900\n")
            .unwrap();
        let s = SchedulerCfg::from(&cfg);
        assert_eq!(s.period, Duration::from_millis(250));
        assert_eq!(s.scan_timeout, Duration::from_millis(900));
    }

    #[test]
    fn seed_becomes_fingerprint() {
        let seed = wifiloc_config::SeedFingerprint {
            x: 4,
            y: 5,
            readings: vec![("A".into(), -40)],
        };
        let fp = Fingerprint::from(seed);
        assert_eq!(fp.position(), Position::new(4, 5));
        assert_eq!(fp.readings(), &[SignalReading::resolved("A", -40)]);
    }
}

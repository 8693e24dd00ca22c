//! Results reported by the tracker.

use crate::error::LocError;
use crate::mode::Mode;
use crate::types::Position;
use serde::Serialize;

/// Outcome of one scheduler tick.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// Tracking tick produced an estimate; the position was updated.
    Located(Position),
    /// Tracking tick ran but had nothing to match; position unchanged.
    NoEstimate,
    /// Idle/calibrating tick stored a passive scan record.
    Logged,
    /// Another tick was still in flight.
    Skipped,
    /// Scan or store failure; the next tick retries.
    Failed(LocError),
}

/// Snapshot answered by status queries.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerStatus {
    pub current_mode: Mode,
    /// True while tracking (localizing on every tick).
    pub scanning_active: bool,
    pub store_connected: bool,
    pub scheduler_running: bool,
    /// Ticks completed since the tracker was built.
    pub ticks: u64,
    pub position: Position,
}

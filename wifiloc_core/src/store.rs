//! Fingerprint and scan persistence.
//!
//! The tracker only sees the `FingerprintStore` trait. `MemoryStore` keeps
//! everything in process; `JsonlStore` (see `jsonl_store`) appends JSON
//! documents to files so calibration survives restarts.

use crate::types::{Fingerprint, Position, ScanRecord};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend cannot be reached right now; retry later.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store io: {0}")]
    Io(String),
    #[error("store encoding: {0}")]
    Encoding(String),
}

impl From<StoreError> for crate::error::LocError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(m) => crate::error::LocError::StoreUnavailable(m),
            other => crate::error::LocError::Store(other.to_string()),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Document store for fingerprints and the passive scan log.
pub trait FingerprintStore: Send + Sync {
    fn insert_fingerprint(&self, fp: Fingerprint) -> StoreResult<()>;
    fn insert_scan(&self, rec: ScanRecord) -> StoreResult<()>;
    /// All fingerprints in recording order.
    fn fingerprints(&self) -> StoreResult<Vec<Fingerprint>>;
    /// Delete every fingerprint, returning how many were removed.
    fn clear_fingerprints(&self) -> StoreResult<usize>;
    /// All scan records in insertion order.
    fn scans(&self) -> StoreResult<Vec<ScanRecord>>;

    /// Most recent scan record per distinct coordinate.
    fn latest_scans_per_position(&self) -> StoreResult<Vec<ScanRecord>> {
        Ok(latest_per_position(self.scans()?))
    }

    /// Most recent scan record taken at `at`, if any.
    fn latest_scan_at(&self, at: Position) -> StoreResult<Option<ScanRecord>> {
        Ok(latest_per_position(self.scans()?)
            .into_iter()
            .find(|r| r.position() == at))
    }

    /// Cheap connectivity probe used by status queries.
    fn is_available(&self) -> bool {
        true
    }
}

/// Keep the newest record per `(x, y)`; equal timestamps favor the later
/// insertion. Output is ordered by coordinate.
pub fn latest_per_position(records: Vec<ScanRecord>) -> Vec<ScanRecord> {
    let mut latest: HashMap<Position, ScanRecord> = HashMap::new();
    for rec in records {
        let key = rec.position();
        match latest.get(&key) {
            Some(existing) if existing.timestamp > rec.timestamp => {}
            _ => {
                latest.insert(key, rec);
            }
        }
    }
    let mut out: Vec<ScanRecord> = latest.into_values().collect();
    out.sort_by_key(|r| (r.x, r.y));
    out
}

/// In-process store.
///
/// `set_available(false)` makes every call fail with
/// `StoreError::Unavailable`, which is how tests exercise outage handling.
#[derive(Default)]
pub struct MemoryStore {
    fingerprints: RwLock<Vec<Fingerprint>>,
    scans: RwLock<Vec<ScanRecord>>,
    down: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.down.store(!available, Ordering::Relaxed);
    }

    fn check(&self) -> StoreResult<()> {
        if self.down.load(Ordering::Relaxed) {
            Err(StoreError::Unavailable("memory store marked down".into()))
        } else {
            Ok(())
        }
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("store lock poisoned".into())
}

impl FingerprintStore for MemoryStore {
    fn insert_fingerprint(&self, fp: Fingerprint) -> StoreResult<()> {
        self.check()?;
        self.fingerprints.write().map_err(poisoned)?.push(fp);
        Ok(())
    }

    fn insert_scan(&self, rec: ScanRecord) -> StoreResult<()> {
        self.check()?;
        self.scans.write().map_err(poisoned)?.push(rec);
        Ok(())
    }

    fn fingerprints(&self) -> StoreResult<Vec<Fingerprint>> {
        self.check()?;
        Ok(self.fingerprints.read().map_err(poisoned)?.clone())
    }

    fn clear_fingerprints(&self) -> StoreResult<usize> {
        self.check()?;
        let mut fps = self.fingerprints.write().map_err(poisoned)?;
        let n = fps.len();
        fps.clear();
        Ok(n)
    }

    fn scans(&self) -> StoreResult<Vec<ScanRecord>> {
        self.check()?;
        Ok(self.scans.read().map_err(poisoned)?.clone())
    }

    fn is_available(&self) -> bool {
        !self.down.load(Ordering::Relaxed)
    }
}

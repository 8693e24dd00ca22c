//! Shared localization context.
//!
//! `Tracker` owns the mode, the position estimate, the scan source, the store
//! and the scan timer. It is a cheap `Arc` handle: clone it into control
//! paths (console, signal handler) and every clone sees the same state.
//!
//! The timer thread holds only a weak reference, so dropping the last
//! `Tracker` stops scanning.

use crate::config::{KnnCfg, SchedulerCfg};
use crate::error::{BuildError, LocError, Result};
use crate::localizer::localize;
use crate::mode::Mode;
use crate::scan_error::map_scan_error;
use crate::scheduler::Scheduler;
use crate::signature;
use crate::status::{TickOutcome, TrackerStatus};
use crate::store::FingerprintStore;
use crate::types::{Fingerprint, Position, ScanRecord, Signature};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError, Weak};
use wifiloc_traits::{MonotonicClock, ScanSource};

struct Inner {
    scan: Arc<dyn ScanSource>,
    store: Arc<dyn FingerprintStore>,
    knn: KnnCfg,
    sched_cfg: SchedulerCfg,
    mode: RwLock<Mode>,
    position: RwLock<Position>,
    /// Held for the duration of a tick; a second tick finding it taken skips.
    tick_gate: Mutex<()>,
    ticks: AtomicU64,
    scheduler: Mutex<Option<Scheduler>>,
}

#[derive(Clone)]
pub struct Tracker {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("mode", &self.mode())
            .field("position", &self.position())
            .field("ticks", &self.ticks())
            .finish_non_exhaustive()
    }
}

// ── Builder ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct TrackerBuilder {
    scan: Option<Arc<dyn ScanSource>>,
    store: Option<Arc<dyn FingerprintStore>>,
    knn: Option<KnnCfg>,
    scheduler: Option<SchedulerCfg>,
    initial_mode: Option<Mode>,
    initial_position: Option<Position>,
}

impl TrackerBuilder {
    pub fn with_scan_source(mut self, source: impl ScanSource + 'static) -> Self {
        self.scan = Some(Arc::new(source));
        self
    }

    pub fn with_shared_scan_source(mut self, source: Arc<dyn ScanSource>) -> Self {
        self.scan = Some(source);
        self
    }

    pub fn with_store(mut self, store: impl FingerprintStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Use a store the caller keeps a handle to (e.g. to inspect it in tests).
    pub fn with_shared_store(mut self, store: Arc<dyn FingerprintStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn knn(mut self, knn: KnnCfg) -> Self {
        self.knn = Some(knn);
        self
    }

    pub fn scheduler(mut self, cfg: SchedulerCfg) -> Self {
        self.scheduler = Some(cfg);
        self
    }

    pub fn initial_mode(mut self, mode: Mode) -> Self {
        self.initial_mode = Some(mode);
        self
    }

    pub fn initial_position(mut self, at: Position) -> Self {
        self.initial_position = Some(at);
        self
    }

    /// Validate and construct. The scan timer is not started; call
    /// [`Tracker::start_scheduler`] or enter `tracking`.
    pub fn build(self) -> Result<Tracker> {
        let scan = self
            .scan
            .ok_or_else(|| eyre::Report::new(BuildError::MissingScanSource))?;
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;
        let knn = self.knn.unwrap_or_default();
        let sched_cfg = self.scheduler.unwrap_or_default();

        // ── Validation ───────────────────────────────────────────────────────
        if knn.k == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig("k must be >= 1")));
        }
        if !(knn.epsilon.is_finite() && knn.epsilon >= 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "epsilon must be finite and >= 0",
            )));
        }
        if sched_cfg.period.is_zero() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "scan period must be > 0",
            )));
        }
        if sched_cfg.scan_timeout.is_zero() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "scan timeout must be > 0",
            )));
        }

        Ok(Tracker {
            inner: Arc::new(Inner {
                scan,
                store,
                knn,
                sched_cfg,
                mode: RwLock::new(self.initial_mode.unwrap_or_default()),
                position: RwLock::new(self.initial_position.unwrap_or_default()),
                tick_gate: Mutex::new(()),
                ticks: AtomicU64::new(0),
                scheduler: Mutex::new(None),
            }),
        })
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn store_err(e: crate::store::StoreError) -> eyre::Report {
    eyre::Report::new(LocError::from(e))
}

impl Tracker {
    pub fn builder() -> TrackerBuilder {
        TrackerBuilder::default()
    }

    // ── Mode ─────────────────────────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        *self.inner.mode.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch mode. Any mode keeps the timer running; entering `tracking`
    /// additionally makes sure exactly one timer exists.
    pub fn set_mode(&self, mode: Mode) -> Result<Mode> {
        let previous = {
            let mut guard = self.inner.mode.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, mode)
        };
        if previous != mode {
            tracing::info!(from = %previous, to = %mode, "mode changed");
        } else {
            tracing::debug!(mode = %mode, "mode unchanged");
        }
        if mode == Mode::Tracking {
            self.ensure_scheduler()?;
        }
        Ok(mode)
    }

    /// `true` enters `tracking`, `false` enters `idle`. Returns the new mode.
    pub fn toggle_scanning(&self, enable: bool) -> Result<Mode> {
        self.set_mode(if enable { Mode::Tracking } else { Mode::Idle })
    }

    // ── Position ─────────────────────────────────────────────────────────────

    pub fn position(&self) -> Position {
        *self
            .inner
            .position
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite the estimate directly, bypassing localization.
    pub fn manual_move(&self, to: Position) -> Position {
        let mut guard = self
            .inner
            .position
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let from = std::mem::replace(&mut *guard, to);
        tracing::info!(from = %from, to = %to, "position moved manually");
        to
    }

    fn set_position(&self, to: Position) {
        *self
            .inner
            .position
            .write()
            .unwrap_or_else(PoisonError::into_inner) = to;
    }

    // ── Calibration and store queries ────────────────────────────────────────

    /// Scan once and store the result as a fingerprint labeled `at`.
    ///
    /// Only accepted in `calibrating`. A scan without any resolved strength
    /// is still stored, as an empty fingerprint.
    pub fn record_fingerprint(&self, at: Position) -> Result<Fingerprint> {
        let current = self.mode();
        if !current.accepts_fingerprints() {
            return Err(eyre::Report::new(LocError::WrongMode {
                action: "record fingerprint",
                required: Mode::Calibrating,
                current,
            }));
        }

        let raw = self
            .inner
            .scan
            .scan(self.inner.sched_cfg.scan_timeout)
            .map_err(|e| {
                let err = map_scan_error(&*e);
                tracing::warn!(error = %err, %at, "calibration scan failed");
                eyre::Report::new(err)
            })?;
        let sig = signature::parse(&raw);
        let fp = Fingerprint::new(at, Utc::now(), sig.readings);
        if fp.readings().is_empty() {
            tracing::warn!(%at, "calibration scan had no usable readings; storing empty fingerprint");
        }

        self.inner
            .store
            .insert_fingerprint(fp.clone())
            .map_err(store_err)?;
        tracing::info!(
            x = at.x,
            y = at.y,
            networks = fp.readings().len(),
            device = %sig.device_id,
            "fingerprint recorded"
        );
        Ok(fp)
    }

    /// Store a fingerprint that did not come from a live scan (seed data).
    pub fn import_fingerprint(&self, fp: Fingerprint) -> Result<()> {
        self.inner.store.insert_fingerprint(fp).map_err(store_err)
    }

    pub fn fingerprints(&self) -> Result<Vec<Fingerprint>> {
        self.inner.store.fingerprints().map_err(store_err)
    }

    /// Delete all fingerprints; returns how many were removed.
    pub fn clear_fingerprints(&self) -> Result<usize> {
        let n = self.inner.store.clear_fingerprints().map_err(store_err)?;
        tracing::info!(deleted = n, "fingerprints cleared");
        Ok(n)
    }

    /// Latest scan record per distinct coordinate.
    pub fn map_data(&self) -> Result<Vec<ScanRecord>> {
        self.inner
            .store
            .latest_scans_per_position()
            .map_err(store_err)
    }

    /// Latest scan record taken at the current position.
    pub fn latest_scan(&self) -> Result<Option<ScanRecord>> {
        self.inner
            .store
            .latest_scan_at(self.position())
            .map_err(store_err)
    }

    /// One-shot estimate against the stored fingerprints without touching
    /// the current position.
    pub fn estimate(&self, live: &Signature) -> Result<Option<Position>> {
        let fps = self.fingerprints()?;
        Ok(localize(&live.readings, &fps, &self.inner.knn, self.position()))
    }

    pub fn status(&self) -> TrackerStatus {
        let current_mode = self.mode();
        TrackerStatus {
            current_mode,
            scanning_active: current_mode.localizes(),
            store_connected: self.inner.store.is_available(),
            scheduler_running: self.is_scheduler_running(),
            ticks: self.ticks(),
            position: self.position(),
        }
    }

    // ── Scan timer ───────────────────────────────────────────────────────────

    /// Start the timer, cancelling (and waiting out) any previous instance.
    pub fn start_scheduler(&self) -> Result<()> {
        let mut slot = lock(&self.inner.scheduler);
        if let Some(mut old) = slot.take() {
            tracing::debug!("replacing running scan timer");
            old.stop();
        }
        *slot = Some(self.spawn_scheduler()?);
        Ok(())
    }

    /// Start the timer unless one is already running. Returns whether a new
    /// timer was started.
    pub fn ensure_scheduler(&self) -> Result<bool> {
        let mut slot = lock(&self.inner.scheduler);
        if slot.as_ref().is_some_and(Scheduler::is_running) {
            return Ok(false);
        }
        *slot = Some(self.spawn_scheduler()?);
        Ok(true)
    }

    /// Cancel future ticks; a tick in progress completes first.
    pub fn stop_scheduler(&self) {
        let old = lock(&self.inner.scheduler).take();
        if let Some(mut s) = old {
            s.stop();
        }
    }

    pub fn is_scheduler_running(&self) -> bool {
        lock(&self.inner.scheduler)
            .as_ref()
            .is_some_and(Scheduler::is_running)
    }

    /// Ticks completed since construction, across timer restarts and manual
    /// `tick` calls.
    pub fn ticks(&self) -> u64 {
        self.inner.ticks.load(Ordering::Relaxed)
    }

    fn spawn_scheduler(&self) -> Result<Scheduler> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Scheduler::spawn(self.inner.sched_cfg.period, MonotonicClock::new(), move || {
            if let Some(inner) = weak.upgrade() {
                Tracker { inner }.tick();
            }
        })
        .map_err(|e| eyre::Report::new(LocError::Scan(format!("spawn scan timer: {e}"))))
    }

    // ── Tick ─────────────────────────────────────────────────────────────────

    /// Run one scan cycle now. Returns `Skipped` if another tick holds the
    /// gate. Failures are logged and reported, never propagated.
    pub fn tick(&self) -> TickOutcome {
        let _gate = match self.inner.tick_gate.try_lock() {
            Ok(g) => g,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("previous tick still running; skipping");
                return TickOutcome::Skipped;
            }
        };
        let outcome = self.run_tick();
        self.inner.ticks.fetch_add(1, Ordering::Relaxed);
        outcome
    }

    fn run_tick(&self) -> TickOutcome {
        let raw = match self.inner.scan.scan(self.inner.sched_cfg.scan_timeout) {
            Ok(raw) => raw,
            Err(e) => {
                let err = map_scan_error(&*e);
                tracing::warn!(error = %err, "scan failed; will retry next tick");
                return TickOutcome::Failed(err);
            }
        };
        let sig = signature::parse(&raw);
        let at = self.position();
        let mode = self.mode();
        tracing::trace!(
            mode = %mode,
            device = %sig.device_id,
            networks = sig.readings.len(),
            "scan parsed"
        );

        if mode.localizes() {
            self.track(sig, at)
        } else {
            self.log_passive(sig, at)
        }
    }

    fn track(&self, sig: Signature, at: Position) -> TickOutcome {
        let live = sig.resolved_readings();
        let record = ScanRecord::new(
            at,
            Utc::now(),
            Signature {
                device_id: sig.device_id,
                readings: live.clone(),
            },
        );
        if let Err(e) = self.inner.store.insert_scan(record) {
            tracing::warn!(error = %e, "failed to log live scan; localizing anyway");
        }

        if live.is_empty() {
            tracing::warn!("scan had no networks with a signal strength; position unchanged");
            return TickOutcome::NoEstimate;
        }

        let fps = match self.inner.store.fingerprints() {
            Ok(fps) => fps,
            Err(e) => {
                let err = LocError::from(e);
                tracing::warn!(error = %err, "could not load fingerprints");
                return TickOutcome::Failed(err);
            }
        };
        if fps.is_empty() {
            tracing::warn!("no fingerprints recorded; calibrate first");
            return TickOutcome::NoEstimate;
        }

        match localize(&live, &fps, &self.inner.knn, at) {
            Some(estimate) => {
                self.set_position(estimate);
                tracing::info!(x = estimate.x, y = estimate.y, "position updated");
                TickOutcome::Located(estimate)
            }
            None => {
                tracing::warn!("localization produced no estimate");
                TickOutcome::NoEstimate
            }
        }
    }

    fn log_passive(&self, sig: Signature, at: Position) -> TickOutcome {
        match self
            .inner
            .store
            .insert_scan(ScanRecord::new(at, Utc::now(), sig))
        {
            Ok(()) => {
                tracing::debug!(%at, "passive scan logged");
                TickOutcome::Logged
            }
            Err(e) => {
                let err = LocError::from(e);
                tracing::warn!(error = %err, "failed to log passive scan");
                TickOutcome::Failed(err)
            }
        }
    }
}

//! Recurring scan timer.
//!
//! Spawns one thread that calls the tick closure once per period. Ticks run
//! to completion before the next deadline is computed, so a tick can never
//! overlap its successor; deadlines that elapse while a slow tick runs are
//! skipped, not queued.
//!
//! Stopping (explicitly or on drop) cancels future ticks. A tick already in
//! progress finishes first: `stop` joins the thread after it.
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use wifiloc_traits::clock::Clock;

pub struct Scheduler {
    /// Dropping the sender wakes the thread and ends the loop.
    stop_tx: Option<xch::Sender<()>>,
    ticks: Arc<AtomicU64>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Scheduler {
    pub fn spawn<F, C>(period: Duration, clock: C, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
        C: Clock + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let (stop_tx, stop_rx) = xch::bounded::<()>(0);
        let ticks = Arc::new(AtomicU64::new(0));
        let ticks_clone = ticks.clone();

        let join_handle = std::thread::Builder::new()
            .name("wifiloc-scan".into())
            .spawn(move || {
                let mut next = clock.now() + period;
                loop {
                    let wait = next.saturating_duration_since(clock.now());
                    match stop_rx.recv_timeout(wait) {
                        Err(xch::RecvTimeoutError::Timeout) => {}
                        // Explicit stop or the owner is gone
                        Ok(()) | Err(xch::RecvTimeoutError::Disconnected) => {
                            tracing::debug!("scan timer received shutdown signal");
                            break;
                        }
                    }

                    tick();
                    ticks_clone.fetch_add(1, Ordering::Relaxed);

                    next += period;
                    let now = clock.now();
                    if next <= now {
                        let behind = now.saturating_duration_since(next);
                        let skipped = behind.as_nanos() / period.as_nanos() + 1;
                        tracing::warn!(
                            skipped = u64::try_from(skipped).unwrap_or(u64::MAX),
                            period_ms = crate::util::duration_ms(period),
                            "tick overran its period; skipping missed ticks"
                        );
                        next = now + period;
                    }
                }
                tracing::trace!("scan timer thread exiting cleanly");
            })?;

        tracing::info!(period_ms = crate::util::duration_ms(period), "scan timer started");
        Ok(Self {
            stop_tx: Some(stop_tx),
            ticks,
            join_handle: Some(join_handle),
        })
    }

    /// Ticks completed by this timer instance.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.join_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel future ticks and wait for an in-flight tick to finish.
    pub fn stop(&mut self) {
        self.stop_tx.take();
        if let Some(handle) = self.join_handle.take() {
            if handle.thread().id() == std::thread::current().id() {
                // Dropped from inside our own tick; the loop exits on return.
                tracing::trace!("scan timer stopped from its own thread; detaching");
                return;
            }
            match handle.join() {
                Ok(()) => {
                    tracing::info!(ticks = self.ticks(), "scan timer stopped");
                }
                Err(e) => {
                    tracing::warn!(?e, "scan timer thread panicked during shutdown");
                }
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Instant;
    use wifiloc_traits::MonotonicClock;

    #[test]
    fn ticks_at_period() {
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let sched = Scheduler::spawn(Duration::from_millis(20), MonotonicClock::new(), move || {
            c.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        std::thread::sleep(Duration::from_millis(210));
        drop(sched);
        let n = count.load(Ordering::Relaxed);
        assert!((5..=11).contains(&n), "unexpected tick count {n}");
    }

    #[test]
    fn slow_ticks_never_overlap() {
        let busy = Arc::new(AtomicBool::new(false));
        let overlapped = Arc::new(AtomicBool::new(false));
        let (b, o) = (busy.clone(), overlapped.clone());
        let sched = Scheduler::spawn(Duration::from_millis(5), MonotonicClock::new(), move || {
            if b.swap(true, Ordering::SeqCst) {
                o.store(true, Ordering::SeqCst);
            }
            std::thread::sleep(Duration::from_millis(20));
            b.store(false, Ordering::SeqCst);
        })
        .unwrap();
        std::thread::sleep(Duration::from_millis(150));
        let ticks = sched.ticks();
        drop(sched);
        assert!(!overlapped.load(Ordering::SeqCst));
        // 150ms of 20ms ticks: overrun deadlines were skipped, not queued
        assert!(ticks <= 8, "ticks = {ticks}");
    }

    #[test]
    fn stop_waits_for_in_flight_tick() {
        let done = Arc::new(AtomicBool::new(false));
        let started = Arc::new(AtomicBool::new(false));
        let (d, s) = (done.clone(), started.clone());
        let mut sched = Scheduler::spawn(Duration::from_millis(5), MonotonicClock::new(), move || {
            s.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(60));
            d.store(true, Ordering::SeqCst);
        })
        .unwrap();
        while !started.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }
        sched.stop();
        assert!(done.load(Ordering::SeqCst));
        assert!(!sched.is_running());
    }

    #[test]
    fn stop_is_prompt_between_ticks() {
        let mut sched =
            Scheduler::spawn(Duration::from_secs(30), MonotonicClock::new(), || {}).unwrap();
        assert!(sched.is_running());
        let start = Instant::now();
        sched.stop();
        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(sched.ticks(), 0);
    }
}

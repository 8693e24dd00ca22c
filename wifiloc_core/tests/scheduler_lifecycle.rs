//! Timer lifecycle through the tracker: idempotent start, replacement,
//! and shutdown on drop.

use std::time::Duration;
use wifiloc_core::{MemoryStore, Mode, SchedulerCfg, Tracker};
use wifiloc_scan::{SimulatedScanSource, render_report};

const PERIOD_MS: u64 = 40;
const WINDOW_MS: u64 = 420;

fn tracker(src: SimulatedScanSource) -> Tracker {
    Tracker::builder()
        .with_scan_source(src)
        .with_store(MemoryStore::new())
        .scheduler(SchedulerCfg {
            period: Duration::from_millis(PERIOD_MS),
            scan_timeout: Duration::from_secs(1),
        })
        .build()
        .unwrap()
}

fn src() -> SimulatedScanSource {
    SimulatedScanSource::new(render_report("aa:bb:cc:dd:ee:ff", &[("A", -40)]))
}

#[test]
fn entering_tracking_twice_runs_one_timer() {
    let t = tracker(src());
    t.set_mode(Mode::Tracking).unwrap();
    t.set_mode(Mode::Tracking).unwrap();
    assert!(!t.ensure_scheduler().unwrap());
    std::thread::sleep(Duration::from_millis(WINDOW_MS));
    t.stop_scheduler();
    let ticks = t.ticks();
    // ~10 expected for one timer; two timers would give ~20.
    assert!((4..=14).contains(&ticks), "ticks = {ticks}");
}

#[test]
fn start_scheduler_replaces_previous_timer() {
    let t = tracker(src());
    t.start_scheduler().unwrap();
    t.start_scheduler().unwrap();
    t.start_scheduler().unwrap();
    std::thread::sleep(Duration::from_millis(WINDOW_MS));
    t.stop_scheduler();
    let ticks = t.ticks();
    assert!((4..=14).contains(&ticks), "ticks = {ticks}");
}

#[test]
fn idle_timer_keeps_logging_scans() {
    let s = src();
    let t = tracker(s.clone());
    t.start_scheduler().unwrap();
    assert_eq!(t.mode(), Mode::Idle);
    std::thread::sleep(Duration::from_millis(200));
    t.stop_scheduler();
    assert!(s.scan_count() >= 2);
    assert!(!t.map_data().unwrap().is_empty());
}

#[test]
fn stop_cancels_future_ticks() {
    let t = tracker(src());
    t.start_scheduler().unwrap();
    std::thread::sleep(Duration::from_millis(120));
    t.stop_scheduler();
    assert!(!t.is_scheduler_running());
    let after_stop = t.ticks();
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(t.ticks(), after_stop);
}

#[test]
fn slow_scans_do_not_overlap() {
    // Each scan takes 3 periods; overrun ticks are skipped, not queued.
    let s = src().with_delay(Duration::from_millis(PERIOD_MS * 3));
    let t = tracker(s.clone());
    t.start_scheduler().unwrap();
    std::thread::sleep(Duration::from_millis(WINDOW_MS));
    t.stop_scheduler();
    assert!(t.ticks() <= 4, "ticks = {}", t.ticks());
    assert_eq!(s.scan_count(), t.ticks());
}

#[test]
fn dropping_last_handle_stops_timer() {
    let s = src();
    let t = tracker(s.clone());
    t.start_scheduler().unwrap();
    std::thread::sleep(Duration::from_millis(100));
    drop(t);
    // A tick that had already upgraded its handle finishes on its own.
    std::thread::sleep(Duration::from_millis(20));
    let after_drop = s.scan_count();
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(s.scan_count(), after_drop);
}

use std::cell::Cell;
use std::time::{Duration, Instant};
use wifiloc_scan::ScanError;
use wifiloc_scan::util::wait_until_some_with_timeout;

#[test]
fn returns_value_once_ready() {
    let calls = Cell::new(0);
    let v = wait_until_some_with_timeout(
        || {
            calls.set(calls.get() + 1);
            Ok(if calls.get() >= 3 { Some(42) } else { None })
        },
        Duration::from_millis(200),
        Duration::from_millis(1),
    )
    .unwrap();
    assert_eq!(v, 42);
    assert_eq!(calls.get(), 3);
}

#[test]
fn times_out_when_never_ready() {
    let start = Instant::now();
    let res = wait_until_some_with_timeout(
        || Ok::<Option<()>, ScanError>(None),
        Duration::from_millis(20),
        Duration::from_millis(2),
    );
    assert!(matches!(res, Err(ScanError::Timeout)));
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn propagates_check_errors() {
    let res = wait_until_some_with_timeout(
        || Err::<Option<()>, _>(ScanError::Encoding),
        Duration::from_millis(20),
        Duration::from_millis(2),
    );
    assert!(matches!(res, Err(ScanError::Encoding)));
}

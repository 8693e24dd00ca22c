use std::time::{Duration, Instant};

use crate::error::{Result, ScanError};

/// Poll `check` until it yields a value or `timeout` expires.
/// Sleeps in small intervals between polls to avoid CPU spinning.
pub fn wait_until_some_with_timeout<T>(
    mut check: impl FnMut() -> Result<Option<T>>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<T> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(v) = check()? {
            return Ok(v);
        }
        if Instant::now() >= deadline {
            return Err(ScanError::Timeout);
        }
        std::thread::sleep(poll_interval);
    }
}

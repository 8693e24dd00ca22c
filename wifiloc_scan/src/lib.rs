//! Platform scan adapters.
//!
//! `CommandScanSource` shells out to the OS scan command; `SimulatedScanSource`
//! serves a canned report and is what the CLI and tests use off-device.
//! `FailingScanSource` fails every scan, for exercising retry paths.
pub mod command;
pub mod error;
pub mod util;

pub use command::CommandScanSource;
pub use error::ScanError;

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wifiloc_traits::ScanSource;

/// Simulated scan source serving a replaceable report.
///
/// Clones share the same report and counters, so a test can keep one handle
/// and swap the report while another handle is owned by the scheduler.
#[derive(Clone, Default)]
pub struct SimulatedScanSource {
    report: Arc<Mutex<String>>,
    delay: Duration,
    scans: Arc<AtomicU64>,
}

impl SimulatedScanSource {
    pub fn new(report: impl Into<String>) -> Self {
        Self {
            report: Arc::new(Mutex::new(report.into())),
            delay: Duration::ZERO,
            scans: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Pretend each scan takes `delay`. Scans slower than the caller's
    /// timeout fail with `ScanError::Timeout`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_report(&self, report: impl Into<String>) {
        if let Ok(mut r) = self.report.lock() {
            *r = report.into();
        }
    }

    /// Number of scans served so far (including timed-out ones).
    pub fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }
}

impl ScanSource for SimulatedScanSource {
    fn scan(
        &self,
        timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay.min(timeout));
            if self.delay > timeout {
                return Err(Box::new(ScanError::Timeout));
            }
        }
        let report = self
            .report
            .lock()
            .map(|r| r.clone())
            .map_err(|_| ScanError::Io(std::io::Error::other("simulated report poisoned")))?;
        tracing::trace!(bytes = report.len(), "simulated scan");
        Ok(report)
    }
}

/// Scan source whose every scan fails with a fixed error.
#[derive(Clone, Debug)]
pub struct FailingScanSource {
    timeout: bool,
    message: String,
}

impl FailingScanSource {
    /// Fail with `ScanError::Exit` carrying `message` as stderr.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timeout: false,
            message: message.into(),
        }
    }

    /// Fail with `ScanError::Timeout`.
    pub fn timing_out() -> Self {
        Self {
            timeout: true,
            message: String::new(),
        }
    }
}

impl ScanSource for FailingScanSource {
    fn scan(
        &self,
        _timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        if self.timeout {
            return Err(Box::new(ScanError::Timeout));
        }
        Err(Box::new(ScanError::Exit {
            status: "exit status: 1".into(),
            stderr: self.message.clone(),
        }))
    }
}

/// Render a report in the `system_profiler SPAirPortDataType` layout.
///
/// The first network is listed as the current network, the rest as other
/// local networks.
pub fn render_report(device_mac: &str, networks: &[(&str, i32)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Wi-Fi:");
    let _ = writeln!(out);
    let _ = writeln!(out, "    Interfaces:");
    let _ = writeln!(out, "        en0:");
    let _ = writeln!(out, "          Card Type: Wi-Fi  (0x14E4, 0x4378)");
    let _ = writeln!(out, "          MAC Address: {device_mac}");
    let _ = writeln!(out, "          Status: Connected");
    let mut iter = networks.iter();
    if let Some((name, rssi)) = iter.next() {
        let _ = writeln!(out, "          Current Network Information:");
        write_network(&mut out, name, *rssi, true);
    }
    let rest: Vec<_> = iter.collect();
    if !rest.is_empty() {
        let _ = writeln!(out, "          Other Local Wi-Fi Networks:");
        for (name, rssi) in rest {
            write_network(&mut out, name, *rssi, false);
        }
    }
    out
}

fn write_network(out: &mut String, name: &str, rssi: i32, current: bool) {
    let _ = writeln!(out, "            {name}:");
    let _ = writeln!(out, "              PHY Mode: 802.11ac");
    let _ = writeln!(out, "              Channel: 36 (5GHz, 80MHz)");
    if current {
        let _ = writeln!(out, "              Security: WPA2 Personal");
    }
    let _ = writeln!(out, "              Signal / Noise: {rssi} dBm / -92 dBm");
}

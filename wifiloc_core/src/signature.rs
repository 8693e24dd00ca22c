//! Parser for the textual Wi-Fi report (`system_profiler SPAirPortDataType`).
//!
//! Grammar, per trimmed line:
//! - `MAC Address: <hex:hex:...>` sets the device id. The first one wins.
//! - `Current Network Information:` / `Other Local Wi-Fi Networks:` open a
//!   section. Lines before the first section are ignored.
//! - Inside a section, `<name>:` registers a network and makes it the
//!   current target. A name already registered keeps its slot and does not
//!   move the target. Sub-property labels such as `PHY Mode:` are skipped.
//! - Inside a section, `Signal / Noise: <A> dBm / <B> dBm` sets the strength
//!   of the current target, the most recently inserted network, to `A`.
//!   The target survives section changes; a signal line with no target is
//!   dropped.
//!
//! Parsing never fails: unrecognized input yields an empty signature with
//! device id `N/A`.

use crate::types::{SignalReading, Signature, UNKNOWN_DEVICE};

const MAC_PREFIX: &str = "MAC Address: ";
const CURRENT_SECTION: &str = "Current Network Information:";
const OTHER_SECTION: &str = "Other Local Wi-Fi Networks:";
const SIGNAL_PREFIX: &str = "Signal / Noise: ";

/// Labels that look like network headers but describe the network above.
const NON_SSID_LABELS: &[&str] = &["PHY Mode:", "Channel:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Current,
    Other,
}

#[derive(Default)]
struct ParseState {
    device_id: Option<String>,
    section: Option<Section>,
    readings: Vec<SignalReading>,
    /// Index into `readings` of the network the next signal line belongs to.
    target: Option<usize>,
}

impl ParseState {
    /// Only a first sighting moves the target. A repeated header leaves
    /// signal lines flowing to the last inserted network.
    fn register(&mut self, name: &str) {
        if self.readings.iter().any(|r| r.network_name == name) {
            tracing::trace!(name, "repeated network header; target unchanged");
            return;
        }
        self.readings.push(SignalReading::new(name, None));
        self.target = Some(self.readings.len() - 1);
    }

    fn assign(&mut self, dbm: i32) {
        match self.target {
            Some(i) => self.readings[i].signal_strength = Some(dbm),
            None => tracing::trace!(dbm, "signal line before any network; dropped"),
        }
    }

    fn finish(self) -> Signature {
        Signature {
            device_id: self
                .device_id
                .unwrap_or_else(|| UNKNOWN_DEVICE.to_string()),
            readings: self.readings,
        }
    }
}

/// Parse a raw scan report into a [`Signature`].
pub fn parse(raw: &str) -> Signature {
    let mut st = ParseState::default();

    for line in raw.lines() {
        let line = line.trim();

        if let Some(mac) = parse_mac(line) {
            if st.device_id.is_none() {
                st.device_id = Some(mac.to_string());
            }
            continue;
        }

        if line == CURRENT_SECTION {
            st.section = Some(Section::Current);
            continue;
        }
        if line == OTHER_SECTION {
            st.section = Some(Section::Other);
            continue;
        }

        if st.section.is_none() {
            continue;
        }

        if let Some(name) = parse_network_header(line) {
            st.register(name);
            continue;
        }

        if let Some(dbm) = parse_signal(line) {
            st.assign(dbm);
        }
    }

    st.finish()
}

fn parse_mac(line: &str) -> Option<&str> {
    let mac = line.strip_prefix(MAC_PREFIX)?;
    let valid = !mac.is_empty() && mac.chars().all(|c| c.is_ascii_hexdigit() || c == ':');
    valid.then_some(mac)
}

fn parse_network_header(line: &str) -> Option<&str> {
    if NON_SSID_LABELS.iter().any(|l| line.starts_with(l)) {
        return None;
    }
    let name = line.strip_suffix(':')?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || matches!(c, '.' | '_' | '-'));
    valid.then_some(name)
}

/// `Signal / Noise: -54 dBm / -90 dBm` -> `-54`.
fn parse_signal(line: &str) -> Option<i32> {
    let rest = line.strip_prefix(SIGNAL_PREFIX)?;
    let (signal, noise) = rest.split_once('/')?;
    let signal = parse_dbm(signal.trim_end())?;
    // The noise field must be well formed even though only the signal is kept.
    parse_dbm(noise.strip_prefix(' ')?)?;
    Some(signal)
}

/// `-54 dBm` or `-54dBm` -> `-54`.
fn parse_dbm(field: &str) -> Option<i32> {
    let num = field.strip_suffix("dBm")?.trim_end();
    let digits = num.strip_prefix('-').unwrap_or(num);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    num.parse().ok()
}

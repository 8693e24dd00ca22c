//! Data model shared by the parser, matcher, store and tracker.
//!
//! Field names serialize in the document shape used by the store
//! (`networks`, `name`, `rssi`, `device_mac`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Device identifier used when a report carries no MAC address line.
pub const UNKNOWN_DEVICE: &str = "N/A";

/// One network seen in a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalReading {
    #[serde(rename = "name")]
    pub network_name: String,
    /// Received power in dBm; `None` when the report gave no strength.
    #[serde(rename = "rssi")]
    pub signal_strength: Option<i32>,
}

impl SignalReading {
    pub fn new(network_name: impl Into<String>, signal_strength: Option<i32>) -> Self {
        Self {
            network_name: network_name.into(),
            signal_strength,
        }
    }

    pub fn resolved(network_name: impl Into<String>, dbm: i32) -> Self {
        Self::new(network_name, Some(dbm))
    }
}

/// Snapshot of nearby networks produced by one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(rename = "device_mac")]
    pub device_id: String,
    #[serde(rename = "networks")]
    pub readings: Vec<SignalReading>,
}

impl Default for Signature {
    fn default() -> Self {
        Self {
            device_id: UNKNOWN_DEVICE.to_string(),
            readings: Vec::new(),
        }
    }
}

impl Signature {
    /// Readings whose strength was resolved, in report order.
    pub fn resolved_readings(&self) -> Vec<SignalReading> {
        self.readings
            .iter()
            .filter(|r| r.signal_strength.is_some())
            .cloned()
            .collect()
    }
}

/// Grid coordinate in arbitrary, deployment-consistent units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Labeled signature recorded during calibration.
///
/// Only readings with a resolved strength are kept; the constructor and the
/// deserializer both drop the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub x: i64,
    pub y: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "networks", deserialize_with = "resolved_only")]
    readings: Vec<SignalReading>,
}

impl Fingerprint {
    pub fn new(at: Position, timestamp: DateTime<Utc>, readings: Vec<SignalReading>) -> Self {
        Self {
            x: at.x,
            y: at.y,
            timestamp,
            readings: readings
                .into_iter()
                .filter(|r| r.signal_strength.is_some())
                .collect(),
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn readings(&self) -> &[SignalReading] {
        &self.readings
    }
}

fn resolved_only<'de, D>(deserializer: D) -> Result<Vec<SignalReading>, D::Error>
where
    D: Deserializer<'de>,
{
    let all: Vec<SignalReading> = Vec::deserialize(deserializer)?;
    Ok(all
        .into_iter()
        .filter(|r| r.signal_strength.is_some())
        .collect())
}

/// Passive, append-only log entry of one scan at the then-current position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub x: i64,
    pub y: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "device_mac")]
    pub device_id: String,
    #[serde(rename = "networks")]
    pub readings: Vec<SignalReading>,
}

impl ScanRecord {
    pub fn new(at: Position, timestamp: DateTime<Utc>, signature: Signature) -> Self {
        Self {
            x: at.x,
            y: at.y,
            timestamp,
            device_id: signature.device_id,
            readings: signature.readings,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_drops_unresolved_readings() {
        let fp = Fingerprint::new(
            Position::new(1, 2),
            Utc::now(),
            vec![
                SignalReading::resolved("A", -40),
                SignalReading::new("B", None),
            ],
        );
        assert_eq!(fp.readings().len(), 1);
        assert_eq!(fp.readings()[0].network_name, "A");
    }

    #[test]
    fn fingerprint_deserializer_drops_unresolved_readings() {
        let json = r#"{"x":0,"y":0,"timestamp":"2025-05-15T10:00:00Z",
            "networks":[{"name":"A","rssi":-40},{"name":"B","rssi":null}]}"#;
        let fp: Fingerprint = serde_json::from_str(json).unwrap();
        assert_eq!(fp.readings(), &[SignalReading::resolved("A", -40)]);
    }

    #[test]
    fn scan_record_serializes_in_document_shape() {
        let sig = Signature {
            device_id: "aa:bb".into(),
            readings: vec![SignalReading::resolved("A", -40)],
        };
        let rec = ScanRecord::new(Position::new(3, 4), Utc::now(), sig);
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["device_mac"], "aa:bb");
        assert_eq!(v["networks"][0]["name"], "A");
        assert_eq!(v["networks"][0]["rssi"], -40);
        assert_eq!(v["x"], 3);
    }

    #[test]
    fn position_display() {
        assert_eq!(Position::new(-1, 7).to_string(), "(-1,7)");
    }
}

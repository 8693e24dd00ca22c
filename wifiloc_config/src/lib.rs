#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and fingerprint seed parsing for the localization service.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The fingerprint seed CSV loader enforces headers and groups rows into
//!   one seed per coordinate, in first-seen order.
use serde::Deserialize;

/// Fingerprint seed CSV schema.
///
/// Expected headers:
/// x,y,network,rssi
///
/// Example:
/// x,y,network,rssi
/// 0,0,Lobby,-41
/// 0,0,Cafe,-77
/// 100,100,Lobby,-80
#[derive(Debug, Deserialize, Clone)]
pub struct FingerprintRow {
    pub x: i64,
    pub y: i64,
    pub network: String,
    pub rssi: i32,
}

/// One labeled signature loaded from the seed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedFingerprint {
    pub x: i64,
    pub y: i64,
    /// `(network name, rssi dBm)` in file order, deduplicated by name.
    pub readings: Vec<(String, i32)>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScanBackend {
    /// Run the platform scan command.
    #[default]
    Command,
    /// Serve a canned report (see `ScanCfg::simulated_report`).
    Simulated,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScanCfg {
    pub backend: ScanBackend,
    /// Program producing the Wi-Fi report.
    pub command: String,
    pub args: Vec<String>,
    /// Upper bound for one scan command run (ms).
    pub timeout_ms: u64,
    /// Report file served by the simulated backend.
    pub simulated_report: Option<String>,
}

impl Default for ScanCfg {
    fn default() -> Self {
        Self {
            backend: ScanBackend::Command,
            command: "system_profiler".to_string(),
            args: vec!["SPAirPortDataType".to_string()],
            timeout_ms: 15_000,
            simulated_report: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InitialMode {
    #[default]
    Idle,
    Calibrating,
    Tracking,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerCfg {
    /// Tick period (ms).
    pub period_ms: u64,
    /// Mode the tracker starts in.
    pub initial_mode: InitialMode,
    /// Start the recurring scan timer at startup even when not tracking.
    pub autostart: bool,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            period_ms: 5_000,
            initial_mode: InitialMode::Idle,
            autostart: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KnnCfg {
    /// Number of nearest fingerprints combined into the estimate.
    pub k: usize,
    /// Added to each distance before inverting it into a weight.
    pub epsilon: f64,
    /// Strength assumed for a network missing from one side (dBm).
    pub sentinel_dbm: i32,
}

impl Default for KnnCfg {
    fn default() -> Self {
        Self {
            k: 3,
            epsilon: 0.01,
            sentinel_dbm: -100,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Jsonl,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreCfg {
    pub backend: StoreBackend,
    /// Directory holding `fingerprints.jsonl` and `scans.jsonl`.
    pub dir: String,
}

impl Default for StoreCfg {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            dir: "data".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, Copy)]
#[serde(default)]
pub struct PositionCfg {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scan: ScanCfg,
    pub scheduler: SchedulerCfg,
    pub knn: KnnCfg,
    pub store: StoreCfg,
    /// Position estimate before any localization or manual move.
    pub position: PositionCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Scan
        if self.scan.backend == ScanBackend::Command && self.scan.command.trim().is_empty() {
            eyre::bail!("scan.command must not be empty");
        }
        if self.scan.timeout_ms == 0 {
            eyre::bail!("scan.timeout_ms must be >= 1");
        }
        if self.scan.timeout_ms > 10 * 60 * 1000 {
            eyre::bail!("scan.timeout_ms is unreasonably large (>10min)");
        }
        if self.scan.backend == ScanBackend::Simulated && self.scan.simulated_report.is_none() {
            eyre::bail!("scan.simulated_report is required for the simulated backend");
        }

        // Scheduler
        if self.scheduler.period_ms == 0 {
            eyre::bail!("scheduler.period_ms must be >= 1");
        }
        if self.scheduler.period_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("scheduler.period_ms is unreasonably large (>24h)");
        }

        // KNN
        if self.knn.k == 0 {
            eyre::bail!("knn.k must be >= 1");
        }
        if !(self.knn.epsilon.is_finite() && self.knn.epsilon > 0.0) {
            eyre::bail!("knn.epsilon must be a finite value > 0.0");
        }
        if !(-200..=0).contains(&self.knn.sentinel_dbm) {
            eyre::bail!("knn.sentinel_dbm must be in [-200, 0]");
        }

        // Store
        if self.store.backend == StoreBackend::Jsonl && self.store.dir.trim().is_empty() {
            eyre::bail!("store.dir must not be empty for the jsonl backend");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot}");
        }

        Ok(())
    }
}

/// Group seed rows into one fingerprint per `(x, y)`.
///
/// Coordinates keep first-seen order; a network repeated at the same
/// coordinate keeps its first position and takes the later strength.
pub fn group_rows(rows: Vec<FingerprintRow>) -> eyre::Result<Vec<SeedFingerprint>> {
    let mut seeds: Vec<SeedFingerprint> = Vec::new();
    for (idx, row) in rows.into_iter().enumerate() {
        let name = row.network.trim();
        if name.is_empty() {
            eyre::bail!("fingerprint row {} has an empty network name", idx + 2);
        }
        if row.rssi > 0 {
            eyre::bail!(
                "fingerprint row {} has a positive rssi ({} dBm)",
                idx + 2,
                row.rssi
            );
        }
        let seed = match seeds.iter_mut().position(|s| s.x == row.x && s.y == row.y) {
            Some(i) => &mut seeds[i],
            None => {
                seeds.push(SeedFingerprint {
                    x: row.x,
                    y: row.y,
                    readings: Vec::new(),
                });
                let last = seeds.len() - 1;
                &mut seeds[last]
            }
        };
        match seed.readings.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = row.rssi,
            None => seed.readings.push((name.to_string(), row.rssi)),
        }
    }
    Ok(seeds)
}

pub fn load_fingerprints_csv(path: &std::path::Path) -> eyre::Result<Vec<SeedFingerprint>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open fingerprint CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["x", "y", "network", "rssi"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "fingerprint CSV must have headers 'x,y,network,rssi', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<FingerprintRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    group_rows(rows)
}

//! Config loading, backend assembly and the one-shot subcommands.

use eyre::{Result, WrapErr};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wifiloc_config::{Config, ScanBackend, ScanCfg, StoreBackend, StoreCfg};
use wifiloc_core::{
    FingerprintStore, JsonlStore, LocError, MemoryStore, Signature, Tracker, parse_report,
    scan_error::map_scan_error,
};
use wifiloc_scan::{CommandScanSource, SimulatedScanSource};
use wifiloc_traits::ScanSource;

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let cfg = match path {
        Some(p) => {
            let text = fs::read_to_string(p)
                .wrap_err_with(|| format!("read config {}", p.display()))?;
            wifiloc_config::load_toml(&text)
                .wrap_err_with(|| format!("parse config {}", p.display()))?
        }
        None => Config::default(),
    };
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

pub fn scan_source(cfg: &ScanCfg) -> Result<Arc<dyn ScanSource>> {
    match cfg.backend {
        ScanBackend::Command => {
            tracing::debug!(command = %cfg.command, args = ?cfg.args, "using command scan source");
            Ok(Arc::new(CommandScanSource::new(
                cfg.command.clone(),
                cfg.args.clone(),
            )))
        }
        ScanBackend::Simulated => {
            let path = cfg.simulated_report.as_deref().ok_or_else(|| {
                eyre::eyre!("scan.simulated_report is required for the simulated backend")
            })?;
            let report = fs::read_to_string(path)
                .wrap_err_with(|| format!("open simulated report {path}"))?;
            tracing::debug!(path, "using simulated scan source");
            Ok(Arc::new(SimulatedScanSource::new(report)))
        }
    }
}

pub fn store(cfg: &StoreCfg) -> Result<Arc<dyn FingerprintStore>> {
    Ok(match cfg.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Jsonl => Arc::new(
            JsonlStore::open(&cfg.dir).map_err(|e| eyre::Report::new(LocError::from(e)))?,
        ),
    })
}

/// Assemble a tracker from config and import the seed CSV, if any.
/// The scan timer is left stopped.
pub fn build_tracker(cfg: &Config, seeds: Option<&Path>) -> Result<Tracker> {
    let tracker = Tracker::builder()
        .with_shared_scan_source(scan_source(&cfg.scan)?)
        .with_shared_store(store(&cfg.store)?)
        .knn((&cfg.knn).into())
        .scheduler(cfg.into())
        .initial_mode(cfg.scheduler.initial_mode.into())
        .initial_position(cfg.position.into())
        .build()?;

    if let Some(path) = seeds {
        let seeds = wifiloc_config::load_fingerprints_csv(path)?;
        let n = seeds.len();
        for seed in seeds {
            tracker.import_fingerprint(seed.into())?;
        }
        tracing::info!(count = n, path = %path.display(), "seed fingerprints imported");
    }
    Ok(tracker)
}

/// Read a report from `input`, or run one live scan.
pub fn read_report(cfg: &Config, input: Option<&Path>) -> Result<String> {
    match input {
        Some(p) => fs::read_to_string(p).wrap_err_with(|| format!("read report {}", p.display())),
        None => live_scan(cfg),
    }
}

fn live_scan(cfg: &Config) -> Result<String> {
    let source = scan_source(&cfg.scan)?;
    source
        .scan(Duration::from_millis(cfg.scan.timeout_ms))
        .map_err(|e| eyre::Report::new(map_scan_error(&*e)))
}

/// Print a JSON value; compact under `--json`, pretty otherwise.
pub fn emit(json_mode: bool, value: &serde_json::Value) {
    let text = if json_mode {
        value.to_string()
    } else {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    };
    println!("{text}");
}

pub fn signature_json(sig: &Signature) -> serde_json::Value {
    serde_json::to_value(sig).unwrap_or_else(|_| json!(null))
}

pub fn cmd_parse(cfg: &Config, input: Option<&Path>, json_mode: bool) -> Result<()> {
    let sig = parse_report(&read_report(cfg, input)?);
    tracing::debug!(networks = sig.readings.len(), "report parsed");
    emit(json_mode, &signature_json(&sig));
    Ok(())
}

pub fn cmd_scan(cfg: &Config, json_mode: bool) -> Result<()> {
    cmd_parse(cfg, None, json_mode)
}

pub fn cmd_locate(
    cfg: &Config,
    seeds: Option<&Path>,
    input: Option<&Path>,
    json_mode: bool,
) -> Result<()> {
    let tracker = build_tracker(cfg, seeds)?;
    let sig = parse_report(&read_report(cfg, input)?);
    let fingerprints = tracker.fingerprints()?.len();
    let estimate = tracker.estimate(&sig)?;
    match estimate {
        Some(p) => tracing::info!(x = p.x, y = p.y, fingerprints, "position estimated"),
        None => tracing::warn!(fingerprints, "no estimate: not enough data to match"),
    }
    emit(
        json_mode,
        &json!({
            "position": estimate,
            "fingerprints": fingerprints,
            "networks": sig.resolved_readings().len(),
        }),
    );
    Ok(())
}

pub fn cmd_self_check(cfg: &Config, json_mode: bool) -> Result<()> {
    // Config was validated on load.
    let store = store(&cfg.store)?;
    if !store.is_available() {
        return Err(eyre::Report::new(LocError::StoreUnavailable(
            "store reports itself unavailable".into(),
        )));
    }
    let fingerprints = store
        .fingerprints()
        .map_err(|e| eyre::Report::new(LocError::from(e)))?
        .len();
    let sig = parse_report(&live_scan(cfg)?);
    emit(
        json_mode,
        &json!({
            "config": "ok",
            "store": { "ok": true, "fingerprints": fingerprints },
            "scan": {
                "ok": true,
                "device_mac": sig.device_id,
                "networks": sig.resolved_readings().len(),
            },
        }),
    );
    Ok(())
}

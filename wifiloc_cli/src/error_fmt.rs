//! Human-readable error descriptions and structured JSON error formatting.

use wifiloc_core::error::{BuildError, LocError};

/// Stable name for the JSON `reason` field.
pub fn loc_error_name(e: &LocError) -> &'static str {
    match e {
        LocError::Scan(_) => "ScanFailed",
        LocError::ScanTimeout => "ScanTimeout",
        LocError::StoreUnavailable(_) => "StoreUnavailable",
        LocError::Store(_) => "StoreError",
        LocError::WrongMode { .. } => "WrongMode",
        LocError::InvalidInput(_) => "InvalidInput",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingScanSource => {
                "What happened: No scan source was provided to the tracker.\nLikely causes: The scan backend failed to initialize.\nHow to fix: Check the [scan] section of the config.".to_string()
            }
            BuildError::MissingStore => {
                "What happened: No fingerprint store was provided to the tracker.\nLikely causes: The store backend failed to open.\nHow to fix: Check the [store] section of the config.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in [knn] or [scheduler].\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(le) = err.downcast_ref::<LocError>() {
        return match le {
            LocError::ScanTimeout => "What happened: The Wi-Fi scan did not finish in time.\nLikely causes: The scan command hung or the radio is busy.\nHow to fix: Retry, or raise scan.timeout_ms in the config.".to_string(),
            LocError::Scan(msg) => format!(
                "What happened: The Wi-Fi scan failed ({msg}).\nLikely causes: The scan command is missing, not permitted, or Wi-Fi is off.\nHow to fix: Run the scan command by hand, or set scan.backend = \"simulated\" off-device."
            ),
            LocError::StoreUnavailable(msg) => format!(
                "What happened: The fingerprint store is unavailable ({msg}).\nLikely causes: store.dir is missing or not writable.\nHow to fix: Fix the directory permissions or point store.dir elsewhere, then retry."
            ),
            LocError::Store(msg) => format!(
                "What happened: The fingerprint store failed ({msg}).\nLikely causes: Disk full or a corrupt store file.\nHow to fix: Check free space and the files under store.dir."
            ),
            LocError::WrongMode { action, required, current } => format!(
                "What happened: Cannot {action} while {current}.\nLikely causes: The tracker is not in {required} mode.\nHow to fix: Switch with `mode {required}` first."
            ),
            LocError::InvalidInput(msg) => format!(
                "What happened: Invalid input ({msg}).\nHow to fix: Type `help` for the accepted commands."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("invalid configuration") {
        let detail = err
            .chain()
            .nth(1)
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        return format!(
            "What happened: Configuration is invalid{detail}.\nLikely causes: Out-of-range or missing values in the TOML.\nHow to fix: Edit the config file and try again."
        );
    }

    if lower.contains("read config") || lower.contains("parse config") {
        let cause = err.source().map(|s| format!(" Cause: {s}")).unwrap_or_default();
        return format!(
            "What happened: Could not load the config file.{cause}\nHow to fix: Check the --config path and the TOML syntax."
        );
    }

    if lower.contains("fingerprint csv must have headers") {
        return "Invalid headers in fingerprint CSV. Expected 'x,y,network,rssi'.".to_string();
    }

    if lower.contains("simulated report") {
        return format!(
            "What happened: {msg}.\nHow to fix: Point scan.simulated_report at a readable report file."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error class; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(le) = err.downcast_ref::<LocError>() {
        return match le {
            LocError::ScanTimeout => 3,
            LocError::Scan(_) => 4,
            LocError::StoreUnavailable(_) | LocError::Store(_) => 5,
            LocError::WrongMode { .. } | LocError::InvalidInput(_) => 6,
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return 7;
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(le) = err.downcast_ref::<LocError>() {
        return json!({
            "reason": loc_error_name(le),
            "retryable": le.is_retryable(),
            "message": humanize(err),
        })
        .to_string();
    }

    // Generic error JSON
    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}

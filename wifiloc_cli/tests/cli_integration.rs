use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};
use wifiloc_scan::render_report;

const MAC: &str = "a4:83:e7:12:34:56";

fn write_report(dir: &TempDir, name: &str, nets: &[(&str, i32)]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, render_report(MAC, nets)).unwrap();
    path
}

// Simulated backend serving `report`, fast timer, in-memory store
fn write_config(dir: &TempDir, report: &Path, extra: &str) -> PathBuf {
    let toml = format!(
        r#"
[scan]
backend = "simulated"
simulated_report = '{}'
timeout_ms = 1000

[scheduler]
period_ms = 50

[store]
backend = "memory"

{extra}
"#,
        report.display()
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn write_seeds(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("seeds.csv");
    fs::write(
        &path,
        "x,y,network,rssi\n0,0,A,-40\n0,0,B,-70\n100,100,A,-80\n100,100,B,-40\n",
    )
    .unwrap();
    path
}

fn wifiloc() -> Command {
    Command::cargo_bin("wifiloc").unwrap()
}

fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[rstest]
#[case(&["--help"], "Usage:")]
#[case(&["run", "--help"], "--duration-ms")]
#[case(&["--version"], "wifiloc")]
fn help_and_version(#[case] args: &[&str], #[case] needle: &str) {
    wifiloc()
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains(needle));
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    wifiloc()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn parse_file_without_config() {
    let dir = tempdir().unwrap();
    let report = write_report(&dir, "r.txt", &[("Lobby", -41), ("Cafe", -77)]);
    let out = wifiloc()
        .args(["--json", "parse", "--input"])
        .arg(&report)
        .output()
        .unwrap();
    assert!(out.status.success());
    let v = &json_lines(&out.stdout)[0];
    assert_eq!(v["device_mac"], MAC);
    assert_eq!(v["networks"][0]["name"], "Lobby");
    assert_eq!(v["networks"][0]["rssi"], -41);
    assert_eq!(v["networks"][1]["rssi"], -77);
}

#[test]
fn scan_uses_simulated_backend() {
    let dir = tempdir().unwrap();
    let report = write_report(&dir, "r.txt", &[("A", -40)]);
    let cfg = write_config(&dir, &report, "");
    wifiloc()
        .arg("--config")
        .arg(&cfg)
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains(MAC))
        .stdout(predicate::str::contains("\"rssi\": -40"));
}

#[test]
fn locate_against_seeded_fingerprints() {
    let dir = tempdir().unwrap();
    let report = write_report(&dir, "r.txt", &[("A", -80), ("B", -40)]);
    let seeds = write_seeds(&dir);
    let out = wifiloc()
        .arg("--json")
        .arg("--fingerprints")
        .arg(&seeds)
        .args(["locate", "--input"])
        .arg(&report)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v = &json_lines(&out.stdout)[0];
    assert_eq!(v["position"]["x"], 100);
    assert_eq!(v["position"]["y"], 100);
    assert_eq!(v["fingerprints"], 2);
}

#[test]
fn locate_without_fingerprints_reports_null() {
    let dir = tempdir().unwrap();
    let report = write_report(&dir, "r.txt", &[("A", -80)]);
    let out = wifiloc()
        .args(["--json", "locate", "--input"])
        .arg(&report)
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(json_lines(&out.stdout)[0]["position"].is_null());
}

#[test]
fn bad_seed_header_is_explained() {
    let dir = tempdir().unwrap();
    let report = write_report(&dir, "r.txt", &[("A", -80)]);
    let seeds = dir.path().join("bad.csv");
    fs::write(&seeds, "x,y,ssid,rssi\n0,0,A,-40\n").unwrap();
    wifiloc()
        .arg("--fingerprints")
        .arg(&seeds)
        .args(["locate", "--input"])
        .arg(&report)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Expected 'x,y,network,rssi'"));
}

#[rstest]
#[case("[knn]\nk = 0\n", "knn.k must be >= 1")]
#[case("[scheduler]\nperiod_ms = 0\n", "scheduler.period_ms must be >= 1")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
fn invalid_config_is_rejected(#[case] extra: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let report = write_report(&dir, "r.txt", &[("A", -40)]);
    let cfg = dir.path().join("bad.toml");
    fs::write(
        &cfg,
        format!(
            "[scan]\nbackend = \"simulated\"\nsimulated_report = '{}'\n\n{extra}",
            report.display()
        ),
    )
    .unwrap();
    wifiloc()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file() {
    wifiloc()
        .args(["--config", "/definitely/not/here.toml", "scan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not load the config file"));
}

#[test]
fn self_check_passes_with_simulated_backend() {
    let dir = tempdir().unwrap();
    let report = write_report(&dir, "r.txt", &[("A", -40), ("B", -60)]);
    let cfg = write_config(&dir, &report, "");
    let out = wifiloc()
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .output()
        .unwrap();
    assert!(out.status.success());
    let v = &json_lines(&out.stdout)[0];
    assert_eq!(v["config"], "ok");
    assert_eq!(v["scan"]["networks"], 2);
}

#[test]
fn run_console_calibrates_and_reports() {
    let dir = tempdir().unwrap();
    let report = write_report(&dir, "r.txt", &[("A", -40), ("B", -60)]);
    let cfg = write_config(&dir, &report, "");
    let out = wifiloc()
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--mode", "calibrating"])
        .write_stdin("calibrate 3 4\nmove 9 9\nposition\nbogus\nclear\nquit\n")
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let replies = json_lines(&out.stdout);
    assert_eq!(replies[0]["recorded"]["x"], 3);
    assert_eq!(replies[0]["networks"], 2);
    assert_eq!(replies[1]["position"]["x"], 9);
    assert_eq!(replies[2]["position"]["y"], 9);
    assert_eq!(replies[3]["reason"], "InvalidInput");
    assert_eq!(replies[4]["deleted"], 1);
    assert_eq!(replies[5]["bye"], true);
    // Final status after shutdown.
    let status = replies.last().unwrap();
    assert_eq!(status["current_mode"], "calibrating");
    assert_eq!(status["scheduler_running"], false);
}

#[test]
fn run_tracking_localizes_on_timer() {
    let dir = tempdir().unwrap();
    let report = write_report(&dir, "r.txt", &[("A", -40), ("B", -70)]);
    let seeds = write_seeds(&dir);
    let cfg = write_config(&dir, &report, "[position]\nx = 50\ny = 50\n");
    let out = wifiloc()
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .arg("--fingerprints")
        .arg(&seeds)
        .args(["run", "--mode", "tracking", "--duration-ms", "600"])
        .write_stdin("")
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let status = json_lines(&out.stdout).pop().unwrap();
    assert_eq!(status["current_mode"], "tracking");
    assert_eq!(status["position"]["x"], 0);
    assert_eq!(status["position"]["y"], 0);
    assert!(status["ticks"].as_u64().unwrap() >= 1);
}

#[test]
fn run_persists_fingerprints_in_jsonl_store() {
    let dir = tempdir().unwrap();
    let report = write_report(&dir, "r.txt", &[("A", -40)]);
    let store_dir = dir.path().join("store");
    let cfg = dir.path().join("jsonl.toml");
    fs::write(
        &cfg,
        format!(
            "[scan]\nbackend = \"simulated\"\nsimulated_report = '{}'\n\n[scheduler]\nautostart = false\n\n[store]\nbackend = \"jsonl\"\ndir = '{}'\n",
            report.display(),
            store_dir.display()
        ),
    )
    .unwrap();
    wifiloc()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--mode", "calibrating"])
        .write_stdin("calibrate 1 1\ncalibrate 2 2\n")
        .assert()
        .success();
    let text = fs::read_to_string(store_dir.join("fingerprints.jsonl")).unwrap();
    assert_eq!(text.lines().count(), 2);
}

#[cfg(unix)]
#[test]
fn failing_scan_command_maps_to_exit_code() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cmd.toml");
    fs::write(
        &cfg,
        "[scan]\nbackend = \"command\"\ncommand = \"sh\"\nargs = [\"-c\", \"echo radio off >&2; exit 3\"]\n",
    )
    .unwrap();
    let out = wifiloc()
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .arg("scan")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(4));
    let err = String::from_utf8_lossy(&out.stderr);
    let last = err.lines().rev().find(|l| l.contains("\"reason\"")).unwrap();
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["reason"], "ScanFailed");
    assert_eq!(v["retryable"], true);
}

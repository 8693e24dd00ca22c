//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;
use wifiloc_core::Mode;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "wifiloc", version, about = "Wi-Fi fingerprint indoor localization")]
pub struct Cli {
    /// Path to config TOML; built-in defaults are used when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seed fingerprint CSV (strict header: x,y,network,rssi)
    #[arg(long, value_name = "FILE")]
    pub fingerprints: Option<PathBuf>,

    /// Compact JSON output and JSON-lines logs
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModeArg {
    Idle,
    Calibrating,
    Tracking,
}

impl From<ModeArg> for Mode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Idle => Mode::Idle,
            ModeArg::Calibrating => Mode::Calibrating,
            ModeArg::Tracking => Mode::Tracking,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a scan report and print the signature
    Parse {
        /// Report file; runs one live scan when omitted
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Run one live scan and print the signature
    Scan,
    /// Estimate a position once against the stored and seeded fingerprints
    Locate {
        /// Report file; runs one live scan when omitted
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Start the scan timer and a line console on stdin
    Run {
        /// Starting mode (defaults to scheduler.initial_mode)
        #[arg(long, value_enum, value_name = "MODE")]
        mode: Option<ModeArg>,
        /// Stop after this many milliseconds even if stdin stays open
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
    },
    /// Validate config, probe the store and run one scan
    SelfCheck,
}

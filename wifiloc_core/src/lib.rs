#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Wi-Fi fingerprint localization engine (platform-agnostic).
//!
//! Scanning goes through `wifiloc_traits::ScanSource`; persistence goes
//! through [`store::FingerprintStore`].
//!
//! ## Architecture
//!
//! - **Parsing**: scan report text to [`Signature`] (`signature` module)
//! - **Matching**: sentinel-padded Euclidean distance and inverse-distance
//!   weighted KNN (`distance`, `localizer`)
//! - **Modes**: `idle | calibrating | tracking` (`mode`)
//! - **Timer**: one recurring scan thread (`scheduler`)
//! - **Context**: [`Tracker`] ties the above together and is the control
//!   surface used by the CLI

pub mod config;
pub mod conversions;
pub mod distance;
pub mod error;
pub mod jsonl_store;
pub mod localizer;
pub mod mocks;
pub mod mode;
pub mod scan_error;
pub mod scheduler;
pub mod signature;
pub mod status;
pub mod store;
pub mod tracker;
pub mod types;
pub mod util;

pub use config::{KnnCfg, SchedulerCfg};
pub use error::{BuildError, LocError, Result};
pub use jsonl_store::JsonlStore;
pub use mode::Mode;
pub use status::{TickOutcome, TrackerStatus};
pub use store::{FingerprintStore, MemoryStore, StoreError};
pub use tracker::{Tracker, TrackerBuilder};
pub use types::{Fingerprint, Position, ScanRecord, SignalReading, Signature};

/// Parse a raw scan report. Shorthand for [`signature::parse`].
pub fn parse_report(raw: &str) -> Signature {
    signature::parse(raw)
}

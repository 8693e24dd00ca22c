//! Operating mode of the tracker.
//!
//! Every transition is legal; the only mode-dependent rules are that
//! fingerprints are recorded while `Calibrating` and that scheduler ticks
//! localize while `Tracking`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Idle,
    Calibrating,
    Tracking,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Idle, Mode::Calibrating, Mode::Tracking];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Calibrating => "calibrating",
            Mode::Tracking => "tracking",
        }
    }

    /// Whether scheduler ticks run the matcher in this mode.
    pub fn localizes(self) -> bool {
        matches!(self, Mode::Tracking)
    }

    /// Whether explicit fingerprint recording is accepted in this mode.
    pub fn accepts_fingerprints(self) -> bool {
        matches!(self, Mode::Calibrating)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid mode `{0}`: must be idle, calibrating, or tracking")]
pub struct ParseModeError(pub String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "idle" => Ok(Mode::Idle),
            "calibrating" => Ok(Mode::Calibrating),
            "tracking" => Ok(Mode::Tracking),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

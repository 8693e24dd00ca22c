use crate::mode::Mode;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum LocError {
    #[error("scan failed: {0}")]
    Scan(String),
    #[error("timeout waiting for scan")]
    ScanTimeout,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("wrong mode: {action} requires {required}, current mode is {current}")]
    WrongMode {
        action: &'static str,
        required: Mode,
        current: Mode,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl LocError {
    /// Whether retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LocError::Scan(_)
                | LocError::ScanTimeout
                | LocError::StoreUnavailable(_)
        )
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing scan source")]
    MissingScanSource,
    #[error("missing fingerprint store")]
    MissingStore,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to start scan command `{command}`: {reason}")]
    Spawn { command: String, reason: String },
    #[error("scan command timed out")]
    Timeout,
    #[error("scan command exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    #[error("scan output is not valid UTF-8")]
    Encoding,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;

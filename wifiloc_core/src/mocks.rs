//! Test and helper mocks for wifiloc_core

/// A scan source that always errors; useful when a tracker is only driven
/// through manual moves and seeded fingerprints.
pub struct NoopScanSource;

impl wifiloc_traits::ScanSource for NoopScanSource {
    fn scan(
        &self,
        _timeout: std::time::Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("noop scan source")))
    }
}

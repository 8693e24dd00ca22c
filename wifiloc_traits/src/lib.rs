pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Platform wireless scan capability.
///
/// Implementations return the raw textual report of one scan. The report is
/// expected in the `system_profiler SPAirPortDataType` shape; other backends
/// must reshape their output to match before returning it.
pub trait ScanSource: Send + Sync {
    fn scan(
        &self,
        timeout: std::time::Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: ScanSource + ?Sized> ScanSource for std::sync::Arc<T> {
    fn scan(
        &self,
        timeout: std::time::Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        (**self).scan(timeout)
    }
}

impl<T: ScanSource + ?Sized> ScanSource for Box<T> {
    fn scan(
        &self,
        timeout: std::time::Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        (**self).scan(timeout)
    }
}

//! Maps `Box<dyn Error>` from the `ScanSource` boundary to typed `LocError`.
//!
//! The trait in `wifiloc_traits` uses `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `wifiloc_scan::ScanError`
//! downcasting.

use crate::error::LocError;

/// Map a trait-boundary error to a typed `LocError`.
///
/// Attempts to downcast known scan error types first, then falls back
/// to string-based heuristics.
pub fn map_scan_error(e: &(dyn std::error::Error + 'static)) -> LocError {
    #[cfg(feature = "scan-errors")]
    {
        if let Some(se) = e.downcast_ref::<wifiloc_scan::ScanError>() {
            return match se {
                wifiloc_scan::ScanError::Timeout => LocError::ScanTimeout,
                other => LocError::Scan(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") || s.to_lowercase().contains("timed out") {
        LocError::ScanTimeout
    } else {
        LocError::Scan(s)
    }
}

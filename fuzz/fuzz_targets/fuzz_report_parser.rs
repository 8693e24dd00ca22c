#![no_main]
use libfuzzer_sys::fuzz_target;
use wifiloc_core::distance::distance;

fuzz_target!(|data: &str| {
    let sig = wifiloc_core::parse_report(data);
    assert!(!sig.device_id.is_empty());

    // A repeated header never adds a second entry, so names stay unique.
    let mut names: Vec<&str> = sig.readings.iter().map(|r| r.network_name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), sig.readings.len());

    let d = distance(&sig.readings, &sig.readings);
    assert_eq!(d, 0.0);
});

use std::fs;
use std::io::Write;
use tempfile::tempdir;
use wifiloc_config::load_fingerprints_csv;

#[test]
fn loads_and_groups_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fp.csv");
    let mut f = fs::File::create(&path).unwrap();
    writeln!(f, "x,y,network,rssi").unwrap();
    writeln!(f, "0,0,Lobby,-41").unwrap();
    writeln!(f, "0,0,Cafe Guest,-77").unwrap();
    writeln!(f, "100,100,Lobby,-80").unwrap();
    writeln!(f, "100,100,Cafe Guest, -45").unwrap();
    drop(f);

    let seeds = load_fingerprints_csv(&path).unwrap();
    assert_eq!(seeds.len(), 2);
    assert_eq!((seeds[1].x, seeds[1].y), (100, 100));
    assert_eq!(seeds[1].readings[1], ("Cafe Guest".to_string(), -45));
}

#[test]
fn rejects_bad_headers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fp.csv");
    fs::write(&path, "x,y,ssid,rssi\n0,0,A,-50\n").unwrap();
    let err = load_fingerprints_csv(&path).unwrap_err();
    assert!(
        err.to_string()
            .contains("fingerprint CSV must have headers")
    );
}

#[test]
fn reports_bad_row_number() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fp.csv");
    fs::write(&path, "x,y,network,rssi\n0,0,A,-50\n0,zero,B,-60\n").unwrap();
    let err = load_fingerprints_csv(&path).unwrap_err();
    assert!(err.to_string().contains("invalid CSV row 3"), "got: {err}");
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = load_fingerprints_csv(&dir.path().join("nope.csv")).unwrap_err();
    assert!(err.to_string().contains("open fingerprint CSV"));
}
